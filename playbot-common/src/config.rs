//! Configuration file discovery and loading
//!
//! Config file resolution follows this priority order:
//! 1. Explicit path (command-line argument)
//! 2. Environment variable
//! 3. User config directory (`~/.config/playbot/config.toml` on Linux)
//! 4. System-wide config (`/etc/playbot/config.toml`, Unix only)
//!
//! A missing config file is not an error: callers fall back to compiled
//! defaults. A config file that exists but cannot be parsed is an error.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "PLAYBOT_CONFIG";

/// Application directory name under the platform config dir
const APP_DIR: &str = "playbot";

/// Locate the config file to use, if any
///
/// An explicit path or environment variable that points at a missing file
/// is reported as an error, since the operator asked for it by name.
pub fn locate_config_file(explicit: Option<&Path>, env_var_name: &str) -> Result<Option<PathBuf>> {
    // Priority 1: Command-line argument
    if let Some(path) = explicit {
        return require_exists(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return require_exists(PathBuf::from(path));
        }
    }

    // Priority 3: User config directory
    if let Some(path) = dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml")) {
        if path.exists() {
            return Ok(Some(path));
        }
    }

    // Priority 4: System-wide config
    if cfg!(unix) {
        let system_config = PathBuf::from("/etc").join(APP_DIR).join("config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }
    }

    Ok(None)
}

fn require_exists(path: PathBuf) -> Result<Option<PathBuf>> {
    if path.exists() {
        Ok(Some(path))
    } else {
        Err(Error::Config(format!("Config file not found: {}", path.display())))
    }
}

/// Parse a TOML config file into `T`
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    Ok(config)
}

/// Locate and load a TOML config, falling back to `T::default()` when no
/// file is found
pub fn load_or_default<T>(explicit: Option<&Path>, env_var_name: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match locate_config_file(explicit, env_var_name)? {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            load_toml(&path)
        }
        None => {
            warn!("No configuration file found, using built-in defaults");
            Ok(T::default())
        }
    }
}
