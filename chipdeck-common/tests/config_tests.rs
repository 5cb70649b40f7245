//! Integration tests for config file resolution and loading
//!
//! Tests that manipulate CHIPDECK_CONFIG are marked with #[serial] so they
//! never observe each other's environment.

use chipdeck_common::config::{
    load_toml, load_toml_or_default, resolve_config_path, LoggingConfig, CONFIG_ENV_VAR,
};
use chipdeck_common::Error;
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Default, Deserialize, PartialEq)]
struct Sample {
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    name: String,
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_env_var_used_when_no_cli_arg() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/chipdeck-env.toml");

    let path = resolve_config_path(None, CONFIG_ENV_VAR);
    assert_eq!(path, Some(PathBuf::from("/tmp/chipdeck-env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_cli_arg_beats_env_var() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/chipdeck-env.toml");

    let path = resolve_config_path(Some(Path::new("/tmp/chipdeck-cli.toml")), CONFIG_ENV_VAR);
    assert_eq!(path, Some(PathBuf::from("/tmp/chipdeck-cli.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_blank_env_var_is_ignored() {
    env::set_var(CONFIG_ENV_VAR, "   ");

    let path = resolve_config_path(None, CONFIG_ENV_VAR);
    assert_ne!(path, Some(PathBuf::from("   ")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_load_valid_file() {
    let file = write_config(
        r#"
        name = "deck"

        [logging]
        level = "debug"
        "#,
    );

    let sample: Sample = load_toml(file.path()).unwrap();
    assert_eq!(sample.name, "deck");
    assert_eq!(sample.logging.level, "debug");
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let sample: Sample =
        load_toml_or_default(Some(Path::new("/nonexistent/chipdeck/config.toml"))).unwrap();
    assert_eq!(sample, Sample::default());
}

#[test]
fn test_malformed_file_is_config_error() {
    let file = write_config("name = [unterminated");

    let result: Result<Sample, Error> = load_toml_or_default(Some(file.path()));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_load_toml_reports_missing_file_as_io() {
    let result: Result<Sample, Error> = load_toml(Path::new("/nonexistent/chipdeck.toml"));
    assert!(matches!(result, Err(Error::Io(_))));
}
