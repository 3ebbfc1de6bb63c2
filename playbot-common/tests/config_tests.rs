//! Unit tests for config file discovery and loading
//!
//! Uses serial_test: tests that manipulate PLAYBOT_CONFIG run sequentially.

use playbot_common::config::{load_or_default, load_toml, locate_config_file};
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::io::Write;

const TEST_ENV_VAR: &str = "PLAYBOT_TEST_CONFIG";

#[derive(Debug, Deserialize, Default, PartialEq)]
struct SampleConfig {
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    name: Option<String>,
}

fn write_config(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    path
}

#[test]
fn test_load_toml_parses_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "port = 6000\nname = \"bot\"\n");

    let config: SampleConfig = load_toml(&path).unwrap();
    assert_eq!(config.port, Some(6000));
    assert_eq!(config.name.as_deref(), Some("bot"));
}

#[test]
fn test_load_toml_rejects_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "port = [unterminated");

    let result: playbot_common::Result<SampleConfig> = load_toml(&path);
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_explicit_path_wins_over_env() {
    let explicit_dir = tempfile::tempdir().unwrap();
    let env_dir = tempfile::tempdir().unwrap();
    let explicit = write_config(&explicit_dir, "port = 1");
    let from_env = write_config(&env_dir, "port = 2");
    env::set_var(TEST_ENV_VAR, &from_env);

    let located = locate_config_file(Some(&explicit), TEST_ENV_VAR).unwrap();
    assert_eq!(located, Some(explicit));

    env::remove_var(TEST_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_when_no_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "port = 7");
    env::set_var(TEST_ENV_VAR, &path);

    let config: SampleConfig = load_or_default(None, TEST_ENV_VAR).unwrap();
    assert_eq!(config.port, Some(7));

    env::remove_var(TEST_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_explicit_file_is_error() {
    env::remove_var(TEST_ENV_VAR);
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    assert!(locate_config_file(Some(&missing), TEST_ENV_VAR).is_err());
}
