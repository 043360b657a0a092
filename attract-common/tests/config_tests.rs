//! Tests for config file discovery and graceful degradation
//!
//! - Missing config files SHALL NOT cause termination
//! - Malformed config files SHALL be reported as configuration errors
//! - CLI path beats environment variable beats per-user directory
//!
//! Note: Uses serial_test to prevent ENV variable race conditions.

use attract_common::config::{load_toml_or_default, resolve_config_path, LoggingConfig};
use attract_common::Error;
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

const TEST_ENV_VAR: &str = "ATTRACT_CONFIG_TEST";

#[derive(Debug, Default, Deserialize, PartialEq)]
struct SampleConfig {
    #[serde(default)]
    buffer_len: Option<usize>,
    #[serde(default)]
    logging: LoggingConfig,
}

#[test]
#[serial]
fn test_env_var_used_when_no_cli_arg() {
    env::set_var(TEST_ENV_VAR, "/tmp/from-env.toml");

    let resolved = resolve_config_path(None, TEST_ENV_VAR);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/from-env.toml")));

    env::remove_var(TEST_ENV_VAR);
}

#[test]
#[serial]
fn test_cli_arg_beats_env_var() {
    env::set_var(TEST_ENV_VAR, "/tmp/from-env.toml");

    let cli = PathBuf::from("/tmp/from-cli.toml");
    let resolved = resolve_config_path(Some(&cli), TEST_ENV_VAR);
    assert_eq!(resolved, Some(cli));

    env::remove_var(TEST_ENV_VAR);
}

#[test]
#[serial]
fn test_empty_env_var_is_ignored() {
    env::set_var(TEST_ENV_VAR, "");

    let resolved = resolve_config_path(None, TEST_ENV_VAR);
    // Only the per-user file may be picked up, never an empty path
    assert_ne!(resolved, Some(PathBuf::from("")));

    env::remove_var(TEST_ENV_VAR);
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let path = PathBuf::from("/nonexistent/attract/config.toml");
    let config: SampleConfig = load_toml_or_default(Some(&path)).unwrap();
    assert_eq!(config, SampleConfig::default());
}

#[test]
fn test_valid_file_is_parsed() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "buffer_len = 5").unwrap();
    writeln!(file, "[logging]").unwrap();
    writeln!(file, "level = \"debug\"").unwrap();
    writeln!(file, "file = \"attract.log\"").unwrap();

    let config: SampleConfig = load_toml_or_default(Some(file.path())).unwrap();
    assert_eq!(config.buffer_len, Some(5));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.file, Some(PathBuf::from("attract.log")));
}

#[test]
fn test_logging_section_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[logging]").unwrap();

    let config: SampleConfig = load_toml_or_default(Some(file.path())).unwrap();
    assert_eq!(config.logging, LoggingConfig::default());
}

#[test]
fn test_malformed_file_is_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "buffer_len = = 3").unwrap();

    let result: Result<SampleConfig, Error> = load_toml_or_default(Some(file.path()));
    assert!(matches!(result, Err(Error::Config(_))));
}
