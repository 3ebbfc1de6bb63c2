//! Per-session playback
//!
//! - [`queue`]: ordered track list owned by one session
//! - [`controller`]: the session actor and its client handle
//! - [`registry`]: map from session id to live session

pub mod controller;
pub mod queue;
pub mod registry;

pub use controller::{EnqueueReceipt, PlayToken, PlaybackController, SessionHandle, SessionStatus};
pub use queue::{EntryId, QueueStore, QueuedTrack};
pub use registry::SessionRegistry;
