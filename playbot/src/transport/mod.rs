//! Audio transport interface
//!
//! The transport renders one stream at a time for one session and reports,
//! exactly once per successful `start`, that playback ended. The report may
//! arrive on any thread; the playback controller re-marshals it into its own
//! actor before touching any state.

pub mod ffmpeg;

use crate::error::TransportError;
use playbot_common::SessionId;
use std::sync::Arc;

pub use ffmpeg::{FfmpegTransport, FfmpegTransportFactory};

/// One-shot completion callback handed to [`TransportAdapter::start`]
///
/// Consumed by [`FinishNotifier::notify`], so it cannot fire twice.
pub struct FinishNotifier(Box<dyn FnOnce(Option<TransportError>) + Send + 'static>);

impl FinishNotifier {
    pub fn new(callback: impl FnOnce(Option<TransportError>) + Send + 'static) -> Self {
        Self(Box::new(callback))
    }

    /// Report the end of playback, with the error if it ended abnormally
    pub fn notify(self, error: Option<TransportError>) {
        (self.0)(error)
    }
}

impl std::fmt::Debug for FinishNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FinishNotifier")
    }
}

/// Playback sink for one session
///
/// Contract:
/// - `start` returning `Ok` guarantees exactly one later `on_finish.notify`,
///   whether playback ends naturally, through `stop`, or on error.
/// - `start` returning `Err` drops `on_finish` without calling it.
/// - `stop` with nothing playing is a no-op.
pub trait TransportAdapter: Send + Sync {
    fn start(&self, locator: &str, on_finish: FinishNotifier) -> Result<(), TransportError>;

    fn stop(&self);
}

/// Creates the transport for a session when it is first joined
pub trait TransportFactory: Send + Sync {
    fn connect(&self, session_id: SessionId) -> Result<Arc<dyn TransportAdapter>, TransportError>;
}
