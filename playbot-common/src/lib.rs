//! # Playbot Common Library
//!
//! Shared code for the playbot service and its tooling:
//! - Track and session data model
//! - Event types (PlaybotEvent enum)
//! - Configuration file discovery and loading

pub mod config;
pub mod error;
pub mod events;
pub mod track;

pub use error::{Error, Result};
pub use events::{PlaybotEvent, SessionState};
pub use track::{SessionId, TrackEntry, TrackInfo};
