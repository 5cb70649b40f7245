//! # chipdeck Common Library
//!
//! Shared code for the chipdeck crates including:
//! - Error type shared by configuration loading
//! - Event types (ChipdeckEvent enum) and the broadcast EventBus
//! - Playback enums (repeat mode, subtune cursor, playing/paused)
//! - TOML configuration loading
//! - Time and human-readable clock helpers

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;
pub mod time;

pub use error::{Error, Result};
pub use events::{ChipdeckEvent, EventBus, PlaybackState, RepeatMode, SubtuneCursor};
