//! Configuration for the playbot service
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments / environment variables (via clap)
//! 2. TOML configuration file
//! 3. Built-in defaults (code constants)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete service configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub playback: PlaybackSettings,
    pub resolver: ResolverConfig,
    pub transport: TransportConfig,
    pub logging: LoggingConfig,
}

/// HTTP command surface
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5750,
        }
    }
}

/// Playlist persistence
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub playlists_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            playlists_dir: PathBuf::from("playlists"),
        }
    }
}

/// Per-session playback behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Upper bound on a single resolution call; exceeding it drops the track
    pub resolve_timeout_ms: u64,
    /// Resolve the next track in the background while the current one plays
    pub prefetch: bool,
    /// Stream locators older than this are re-resolved before playback
    pub locator_max_age_secs: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            resolve_timeout_ms: 30_000,
            prefetch: true,
            locator_max_age_secs: 3600,
        }
    }
}

impl PlaybackSettings {
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }

    pub fn locator_max_age(&self) -> Duration {
        Duration::from_secs(self.locator_max_age_secs)
    }
}

/// yt-dlp resolver backend
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub program: PathBuf,
    pub format: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("yt-dlp"),
            format: "bestaudio/best".to_string(),
        }
    }
}

/// ffmpeg transport backend
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub program: PathBuf,
    /// Arguments placed after the input, selecting the output sink
    pub output_args: Vec<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            output_args: vec!["-f".to_string(), "null".to_string(), "-".to_string()],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// tracing-subscriber filter directive, used when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "playbot=info,tower_http=info".to_string(),
        }
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub playlists_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration from the located TOML file (or defaults) and
    /// apply command-line overrides on top
    pub fn load(config_path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut config: Config = playbot_common::config::load_or_default(
            config_path,
            playbot_common::config::CONFIG_ENV_VAR,
        )?;
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides in place
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(bind) = overrides.bind {
            self.server.bind = bind;
        }
        if let Some(dir) = overrides.playlists_dir {
            self.storage.playlists_dir = dir;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.playback.resolve_timeout_ms == 0 {
            return Err(Error::Config(
                "playback.resolve_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.storage.playlists_dir.as_os_str().is_empty() {
            return Err(Error::Config("storage.playlists_dir must not be empty".to_string()));
        }
        Ok(())
    }
}
