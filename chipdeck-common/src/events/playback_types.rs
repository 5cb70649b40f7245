//! Playback-related type definitions
//!
//! Supporting types shared between the reconciliation loop, the state
//! publisher and anything observing its events.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Playback state enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    #[default]
    Paused,
}

impl PlaybackState {
    pub fn from_playing(is_playing: bool) -> Self {
        if is_playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// Repeat mode selected by the user
///
/// Only `None` and `Playlist` move between tracks on natural end. `Track`
/// repeats are restarted by the engine itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Play through the playlist once, then stop
    #[default]
    None,
    /// Loop the whole playlist
    Playlist,
    /// Loop the current track
    Track,
}

impl std::fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepeatMode::None => write!(f, "none"),
            RepeatMode::Playlist => write!(f, "playlist"),
            RepeatMode::Track => write!(f, "track"),
        }
    }
}

impl FromStr for RepeatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(RepeatMode::None),
            "playlist" | "all" => Ok(RepeatMode::Playlist),
            "track" | "one" => Ok(RepeatMode::Track),
            other => Err(format!("unknown repeat mode '{}'", other)),
        }
    }
}

/// Subtune cursor within a loaded file (multi-tune containers)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SubtuneCursor {
    /// Zero-based index of the active subtune
    pub index: i32,
    /// Number of subtunes in the file
    pub count: i32,
}

impl SubtuneCursor {
    pub fn new(index: i32, count: i32) -> Self {
        Self { index, count }
    }
}

impl std::fmt::Display for SubtuneCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.index + 1, self.count)
    }
}
