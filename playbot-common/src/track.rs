//! Track and session identifiers shared across crates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of one independent listening session (one guild)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(SessionId)
    }
}

impl From<u64> for SessionId {
    fn from(id: u64) -> Self {
        SessionId(id)
    }
}

/// Result of resolving a user-supplied reference
///
/// When a reference expands to a collection (a playlist link), resolvers
/// return only the first item of the expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub title: String,
    /// Normalized source identifier, used as the dedup key
    pub canonical_reference: String,
    /// Short-lived playable address
    pub stream_locator: String,
}

/// One track in a live queue or a playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackEntry {
    pub title: String,
    pub canonical_reference: String,
    /// `None` means the entry must be resolved before it can be played
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_locator: Option<String>,
    pub requester: String,
}

impl TrackEntry {
    /// Build a queue entry from a fresh resolution
    pub fn from_info(info: TrackInfo, requester: impl Into<String>) -> Self {
        Self {
            title: info.title,
            canonical_reference: info.canonical_reference,
            stream_locator: Some(info.stream_locator),
            requester: requester.into(),
        }
    }

    /// Whether a stream locator is available
    pub fn is_resolved(&self) -> bool {
        self.stream_locator.is_some()
    }

    /// Copy of this entry with the locator dropped, forcing re-resolution
    pub fn without_locator(&self) -> Self {
        Self {
            stream_locator: None,
            ..self.clone()
        }
    }

    /// Apply a fresh resolution, keeping the requester
    pub fn apply_resolution(&mut self, info: TrackInfo) {
        self.title = info.title;
        self.stream_locator = Some(info.stream_locator);
    }
}
