//! Named playlists
//!
//! Persistent track lists that outlive sessions, plus the dedup rules used
//! when moving tracks between a playlist and a live queue.

pub mod merge;
pub mod store;

pub use merge::{merge_into_queue, union_by_reference};
pub use store::{validate_name, PlaylistStore};
