//! ffmpeg process transport
//!
//! Each started track is one `ffmpeg` child process reading the stream
//! locator. A watcher task owns the child, waits for it to exit or for a stop
//! request, and fires the finish notifier once the process is gone.

use super::{FinishNotifier, TransportAdapter, TransportFactory};
use crate::config::TransportConfig;
use crate::error::TransportError;
use playbot_common::SessionId;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Input options that let ffmpeg survive dropped HTTP streams
const INPUT_OPTIONS: [&str; 6] = [
    "-reconnect",
    "1",
    "-reconnect_streamed",
    "1",
    "-reconnect_delay_max",
    "5",
];

/// Occupied from a successful start until the watcher has reaped the child
struct ActivePlayback {
    /// Taken by the first `stop`
    stop_tx: Option<oneshot::Sender<()>>,
}

type Slot = Arc<Mutex<Option<ActivePlayback>>>;

fn lock(slot: &Slot) -> MutexGuard<'_, Option<ActivePlayback>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct FfmpegTransport {
    session_id: SessionId,
    program: PathBuf,
    output_args: Vec<String>,
    slot: Slot,
}

impl FfmpegTransport {
    pub fn new(session_id: SessionId, config: &TransportConfig) -> Self {
        Self {
            session_id,
            program: config.program.clone(),
            output_args: config.output_args.clone(),
            slot: Arc::new(Mutex::new(None)),
        }
    }
}

impl TransportAdapter for FfmpegTransport {
    fn start(&self, locator: &str, on_finish: FinishNotifier) -> Result<(), TransportError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TransportError::Spawn(format!("no async runtime: {}", e)))?;
        let _entered = runtime.enter();

        let mut guard = lock(&self.slot);
        if guard.is_some() {
            return Err(TransportError::Spawn(
                "a track is already playing on this session".to_string(),
            ));
        }

        let child = Command::new(&self.program)
            .args(INPUT_OPTIONS)
            .arg("-i")
            .arg(locator)
            .arg("-vn")
            .args(&self.output_args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                TransportError::Spawn(format!("failed to run {}: {}", self.program.display(), e))
            })?;

        debug!(session = %self.session_id, pid = ?child.id(), "Transport process started");
        let (stop_tx, stop_rx) = oneshot::channel();
        *guard = Some(ActivePlayback {
            stop_tx: Some(stop_tx),
        });
        drop(guard);

        runtime.spawn(watch(
            self.session_id,
            child,
            stop_rx,
            Arc::clone(&self.slot),
            on_finish,
        ));
        Ok(())
    }

    fn stop(&self) {
        let stop_tx = lock(&self.slot)
            .as_mut()
            .and_then(|active| active.stop_tx.take());
        if let Some(stop_tx) = stop_tx {
            debug!(session = %self.session_id, "Stopping transport process");
            let _ = stop_tx.send(());
        }
    }
}

/// Wait for the child to exit or be stopped, free the slot, then notify
async fn watch(
    session_id: SessionId,
    mut child: Child,
    stop_rx: oneshot::Receiver<()>,
    slot: Slot,
    on_finish: FinishNotifier,
) {
    let error = tokio::select! {
        status = child.wait() => match status {
            Ok(status) if status.success() => None,
            Ok(status) => Some(TransportError::Playback(format!("ffmpeg exited with {}", status))),
            Err(e) => Some(TransportError::Playback(format!("failed to wait on ffmpeg: {}", e))),
        },
        // A dropped sender means the transport itself went away
        _ = stop_rx => {
            if let Err(e) = child.kill().await {
                warn!(session = %session_id, "Failed to kill transport process: {}", e);
            }
            None
        }
    };

    lock(&slot).take();
    debug!(session = %session_id, ?error, "Transport process finished");
    on_finish.notify(error);
}

/// Creates one [`FfmpegTransport`] per session
pub struct FfmpegTransportFactory {
    config: TransportConfig,
}

impl FfmpegTransportFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

impl TransportFactory for FfmpegTransportFactory {
    fn connect(&self, session_id: SessionId) -> Result<Arc<dyn TransportAdapter>, TransportError> {
        Ok(Arc::new(FfmpegTransport::new(session_id, &self.config)))
    }
}
