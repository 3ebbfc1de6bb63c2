//! Shared service state
//!
//! Thread-safe state shared between the session actors, the playlist store
//! and the HTTP layer. Only the event broadcaster lives here; per-session
//! queues are owned by their actors and never shared.

use playbot_common::{PlaybotEvent, SessionId, SessionState};
use tokio::sync::broadcast;

/// Capacity of the event broadcast channel
const EVENT_CAPACITY: usize = 256;

/// Shared state accessible by all components
pub struct SharedState {
    /// Event broadcaster for SSE clients and observers
    pub event_tx: broadcast::Sender<PlaybotEvent>,
}

impl SharedState {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { event_tx }
    }

    /// Broadcast an event to all listeners
    pub fn broadcast_event(&self, event: PlaybotEvent) {
        // No receivers is OK
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to the event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlaybotEvent> {
        self.event_tx.subscribe()
    }

    pub fn emit_state(&self, session_id: SessionId, state: SessionState) {
        self.broadcast_event(PlaybotEvent::SessionStateChanged {
            session_id,
            state,
            timestamp: chrono::Utc::now(),
        });
    }

    pub fn emit_queue_changed(&self, session_id: SessionId, length: usize) {
        self.broadcast_event(PlaybotEvent::QueueChanged {
            session_id,
            length,
            timestamp: chrono::Utc::now(),
        });
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
