//! Queue Store
//!
//! Ordered track list of one session. Index 0 is the track that is playing
//! or about to play.
//!
//! The store does no locking of its own: it is owned by a session actor and
//! only ever mutated from inside that actor.

use crate::error::{Error, Result};
use playbot_common::{TrackEntry, TrackInfo};
use rand::seq::SliceRandom;
use std::time::Duration;
use tokio::time::Instant;

/// Identity of one queue slot, unique within a session
pub type EntryId = u64;

/// Queue slot: a track plus the identity of the slot holding it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTrack {
    pub id: EntryId,
    pub track: TrackEntry,
    /// When the stream locator was obtained
    pub resolved_at: Option<Instant>,
}

impl QueuedTrack {
    /// Whether the locator exists and is young enough to hand to a transport
    pub fn has_fresh_locator(&self, max_age: Duration) -> bool {
        match (&self.track.stream_locator, self.resolved_at) {
            (Some(_), Some(at)) => at.elapsed() <= max_age,
            _ => false,
        }
    }

    pub fn apply_resolution(&mut self, info: TrackInfo) {
        self.track.apply_resolution(info);
        self.resolved_at = Some(Instant::now());
    }
}

#[derive(Debug, Default)]
pub struct QueueStore {
    entries: Vec<QueuedTrack>,
    /// Next slot identity to hand out
    next_id: EntryId,
}

impl QueueStore {
    /// Create new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, returning the identity of its slot
    pub fn enqueue(&mut self, track: TrackEntry) -> EntryId {
        let id = self.next_id;
        self.next_id += 1;
        let resolved_at = track.is_resolved().then(Instant::now);
        self.entries.push(QueuedTrack {
            id,
            track,
            resolved_at,
        });
        id
    }

    /// Entry at index 0
    pub fn peek_head(&self) -> Option<&QueuedTrack> {
        self.entries.first()
    }

    pub fn head_mut(&mut self) -> Option<&mut QueuedTrack> {
        self.entries.first_mut()
    }

    pub fn head_id(&self) -> Option<EntryId> {
        self.entries.first().map(|e| e.id)
    }

    /// Remove and return index 0
    pub fn pop_head(&mut self) -> Result<QueuedTrack> {
        if self.entries.is_empty() {
            return Err(Error::Validation("Queue is empty".to_string()));
        }
        Ok(self.entries.remove(0))
    }

    /// Remove the entry at a 1-based position
    pub fn remove_at(&mut self, position: usize) -> Result<QueuedTrack> {
        if position == 0 || position > self.entries.len() {
            return Err(Error::Validation(format!(
                "Invalid track number {}: the queue has {} tracks",
                position,
                self.entries.len()
            )));
        }
        Ok(self.entries.remove(position - 1))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Randomise everything after index 0
    ///
    /// Returns false (and changes nothing) when there are fewer than two
    /// entries behind the head.
    pub fn shuffle_tail(&mut self) -> bool {
        if self.entries.len() <= 2 {
            return false;
        }
        self.entries[1..].shuffle(&mut rand::thread_rng());
        true
    }

    /// Read-only copy for rendering
    pub fn snapshot(&self) -> Vec<TrackEntry> {
        self.entries.iter().map(|e| e.track.clone()).collect()
    }

    /// Slot at a 0-based index
    pub fn get(&self, index: usize) -> Option<&QueuedTrack> {
        self.entries.get(index)
    }

    pub fn find_mut(&mut self, id: EntryId) -> Option<&mut QueuedTrack> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    pub fn contains_reference(&self, canonical_reference: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.track.canonical_reference == canonical_reference)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
