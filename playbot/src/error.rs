//! Error types for playbot
//!
//! Resolution and transport failures are modelled separately because the
//! playback controller recovers from them locally (drop and continue);
//! everything else is surfaced to the command caller unchanged.

use thiserror::Error;

/// Failure to turn a reference into a playable stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// Backend reported the media as missing, private or region-restricted
    #[error("media unavailable: {0}")]
    Unavailable(String),

    /// Media exists but exposes no playable stream
    #[error("no playable stream for {0}")]
    NoStream(String),

    /// Resolution exceeded the configured time bound
    #[error("resolution timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Resolver backend could not be run
    #[error("resolver backend failed: {0}")]
    Backend(String),

    /// Resolver output could not be understood
    #[error("unreadable resolver output: {0}")]
    Parse(String),
}

/// Failure reported by the audio transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Playback could not be started
    #[error("failed to start playback: {0}")]
    Spawn(String),

    /// Playback ended abnormally
    #[error("playback error: {0}")]
    Playback(String),
}

/// Main error type for playbot
#[derive(Error, Debug)]
pub enum Error {
    /// Caller supplied an invalid name, index or requested an operation
    /// that the current queue cannot satisfy
    #[error("{0}")]
    Validation(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Reference could not be resolved
    #[error("Resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    /// Transport failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Playlist read/write failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// The session actor is gone (left or shut down)
    #[error("Session closed: {0}")]
    SessionClosed(String),

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<playbot_common::Error> for Error {
    fn from(err: playbot_common::Error) -> Self {
        match err {
            playbot_common::Error::Io(e) => Error::Io(e),
            playbot_common::Error::NotFound(msg) => Error::NotFound(msg),
            playbot_common::Error::InvalidInput(msg) => Error::Validation(msg),
            playbot_common::Error::Config(msg) => Error::Config(msg),
            playbot_common::Error::Toml(e) => Error::Config(e.to_string()),
            other => Error::Internal(other.to_string()),
        }
    }
}

/// Convenience Result type using playbot Error
pub type Result<T> = std::result::Result<T, Error>;
