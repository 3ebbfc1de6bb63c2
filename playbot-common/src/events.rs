//! Event types for the playbot event system

use crate::track::SessionId;
use serde::{Deserialize, Serialize};

/// Playback state of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Nothing playing, nothing being resolved
    Idle,
    /// Resolving the head of the queue
    Resolving,
    /// The transport is rendering the head of the queue
    Playing,
    /// A stop was requested; waiting for the transport's finish signal
    Stopping,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Resolving => write!(f, "resolving"),
            SessionState::Playing => write!(f, "playing"),
            SessionState::Stopping => write!(f, "stopping"),
        }
    }
}

/// Playbot event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlaybotEvent {
    /// Session created (first enqueue or explicit join)
    SessionOpened {
        session_id: SessionId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session torn down (leave or shutdown)
    SessionClosed {
        session_id: SessionId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session state machine transition
    SessionStateChanged {
        session_id: SessionId,
        state: SessionState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Transport started a track
    TrackStarted {
        session_id: SessionId,
        title: String,
        canonical_reference: String,
        requester: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Transport reported the end of a track
    TrackFinished {
        session_id: SessionId,
        title: String,
        error: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Head of queue could not be resolved or started and was dropped
    TrackDropped {
        session_id: SessionId,
        title: String,
        canonical_reference: String,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Queue contents changed (notification only)
    QueueChanged {
        session_id: SessionId,
        length: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A named playlist was created, modified or deleted
    PlaylistChanged {
        name: String,
        length: Option<usize>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlaybotEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            PlaybotEvent::SessionOpened { .. } => "SessionOpened",
            PlaybotEvent::SessionClosed { .. } => "SessionClosed",
            PlaybotEvent::SessionStateChanged { .. } => "SessionStateChanged",
            PlaybotEvent::TrackStarted { .. } => "TrackStarted",
            PlaybotEvent::TrackFinished { .. } => "TrackFinished",
            PlaybotEvent::TrackDropped { .. } => "TrackDropped",
            PlaybotEvent::QueueChanged { .. } => "QueueChanged",
            PlaybotEvent::PlaylistChanged { .. } => "PlaylistChanged",
        }
    }

    /// Session the event belongs to, if any
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            PlaybotEvent::SessionOpened { session_id, .. }
            | PlaybotEvent::SessionClosed { session_id, .. }
            | PlaybotEvent::SessionStateChanged { session_id, .. }
            | PlaybotEvent::TrackStarted { session_id, .. }
            | PlaybotEvent::TrackFinished { session_id, .. }
            | PlaybotEvent::TrackDropped { session_id, .. }
            | PlaybotEvent::QueueChanged { session_id, .. } => Some(*session_id),
            PlaybotEvent::PlaylistChanged { .. } => None,
        }
    }
}
