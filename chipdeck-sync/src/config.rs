//! Configuration for the reconciliation loop
//!
//! Bootstrap configuration is a TOML file with two sections:
//!
//! ```toml
//! [logging]
//! level = "info"
//!
//! [sync]
//! playing_interval_ms = 180
//! paused_interval_ms = 320
//! seek_busy_threshold_ms = 250
//! repeat_mode = "playlist"
//! ```
//!
//! Every field has a built-in default, so an empty or missing file is valid.

use chipdeck_common::config::{load_toml_or_default, LoggingConfig};
use chipdeck_common::RepeatMode;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Complete bootstrap configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct TomlConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub sync: SyncConfig,
}

impl TomlConfig {
    /// Load and validate configuration, falling back to defaults when there is no file
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Self = load_toml_or_default(path)?;
        config.sync.validate()?;
        Ok(config)
    }
}

/// Reconciliation loop tuning
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SyncConfig {
    /// Cycle interval while the engine reports playing
    #[serde(default = "default_playing_interval_ms")]
    pub playing_interval_ms: u64,

    /// Cycle interval while paused
    #[serde(default = "default_paused_interval_ms")]
    pub paused_interval_ms: u64,

    /// How long a seek must run before the UI shows a busy indicator
    #[serde(default = "default_seek_busy_threshold_ms")]
    pub seek_busy_threshold_ms: i64,

    /// Metadata re-query period while title or artist is still blank
    #[serde(default = "default_metadata_poll_fast_ms")]
    pub metadata_poll_fast_ms: i64,

    /// Metadata re-query period once title and artist are known
    #[serde(default = "default_metadata_poll_slow_ms")]
    pub metadata_poll_slow_ms: i64,

    /// URL schemes whose sources count as remote
    #[serde(default = "default_remote_schemes")]
    pub remote_schemes: Vec<String>,

    /// Path fragment identifying locally cached copies of remote sources
    #[serde(default = "default_cache_dir_marker")]
    pub cache_dir_marker: String,

    /// Initial repeat mode
    #[serde(default)]
    pub repeat_mode: RepeatMode,

    /// Event bus capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_playing_interval_ms() -> u64 {
    180
}

fn default_paused_interval_ms() -> u64 {
    320
}

fn default_seek_busy_threshold_ms() -> i64 {
    250
}

fn default_metadata_poll_fast_ms() -> i64 {
    500
}

fn default_metadata_poll_slow_ms() -> i64 {
    2500
}

fn default_remote_schemes() -> Vec<String> {
    vec!["http".to_string(), "https".to_string(), "ftp".to_string()]
}

fn default_cache_dir_marker() -> String {
    "/cache/".to_string()
}

fn default_event_capacity() -> usize {
    256
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            playing_interval_ms: default_playing_interval_ms(),
            paused_interval_ms: default_paused_interval_ms(),
            seek_busy_threshold_ms: default_seek_busy_threshold_ms(),
            metadata_poll_fast_ms: default_metadata_poll_fast_ms(),
            metadata_poll_slow_ms: default_metadata_poll_slow_ms(),
            remote_schemes: default_remote_schemes(),
            cache_dir_marker: default_cache_dir_marker(),
            repeat_mode: RepeatMode::default(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl SyncConfig {
    /// Reject values that would stall or spin the loop
    pub fn validate(&self) -> Result<()> {
        if self.playing_interval_ms == 0 || self.paused_interval_ms == 0 {
            return Err(Error::Config(
                "cycle intervals must be greater than zero".to_string(),
            ));
        }
        if self.seek_busy_threshold_ms < 0 {
            return Err(Error::Config(format!(
                "seek_busy_threshold_ms must not be negative (got {})",
                self.seek_busy_threshold_ms
            )));
        }
        if self.metadata_poll_fast_ms <= 0 || self.metadata_poll_slow_ms <= 0 {
            return Err(Error::Config(
                "metadata poll periods must be greater than zero".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Sleep between cycles for the given playing state
    pub fn cycle_interval(&self, is_playing: bool) -> Duration {
        if is_playing {
            Duration::from_millis(self.playing_interval_ms)
        } else {
            Duration::from_millis(self.paused_interval_ms)
        }
    }
}
