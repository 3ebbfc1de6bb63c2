//! # Playbot Playback Coordinator
//!
//! Sequential audio playback for many independent listening sessions (one
//! per guild), each with its own queue, driven by completion signals from an
//! external audio transport.
//!
//! **Architecture:** one tokio actor per session owns that session's queue
//! and state machine. Commands and transport "finished" signals reach the
//! actor only through its channel, so a queue is never mutated from two
//! places at once.

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod playback;
pub mod playlist;
pub mod resolver;
pub mod state;
pub mod transport;

pub use commands::CommandService;
pub use error::{Error, Result};
pub use state::SharedState;
