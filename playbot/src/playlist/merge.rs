//! Merge and dedup by canonical reference
//!
//! Every merged entry has its stream locator cleared: locators expire, and a
//! track coming out of (or going into) a playlist is re-resolved on play.

use crate::playback::QueueStore;
use playbot_common::TrackEntry;
use std::collections::HashSet;

/// Entries of `incoming` whose canonical reference is neither in `existing`
/// nor earlier in `incoming`, in order, with locators cleared
pub fn union_by_reference<'a>(
    existing: impl IntoIterator<Item = &'a str>,
    incoming: &[TrackEntry],
) -> Vec<TrackEntry> {
    let mut seen: HashSet<&str> = existing.into_iter().collect();
    let mut added = Vec::new();

    for entry in incoming {
        if seen.insert(entry.canonical_reference.as_str()) {
            added.push(entry.without_locator());
        }
    }
    added
}

/// Append playlist entries not already queued; returns how many were added
pub fn merge_into_queue(queue: &mut QueueStore, entries: &[TrackEntry]) -> usize {
    let mut added = 0;
    for entry in entries {
        if !queue.contains_reference(&entry.canonical_reference) {
            queue.enqueue(entry.without_locator());
            added += 1;
        }
    }
    added
}
