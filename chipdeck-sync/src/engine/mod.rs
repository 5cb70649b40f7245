//! Engine query facade
//!
//! The playback engine is an opaque, asynchronously driven process. The
//! reconciliation loop only ever talks to it through [`PlaybackEngine`]:
//! point-in-time reads plus two commands.

pub mod sim;

pub use sim::{SimTrack, SimulatedEngine};

use chipdeck_common::SubtuneCursor;
use std::sync::atomic::{AtomicU64, Ordering};

/// Query and command surface of the playback engine
///
/// All reads are cheap, synchronous and infallible: they return the engine's
/// last known good value.
pub trait PlaybackEngine: Send + Sync {
    /// Whether a seek is currently being processed
    fn is_seek_in_progress(&self) -> bool;

    /// Track duration in seconds (stale while seeking)
    fn duration(&self) -> f64;

    /// Playback position in seconds
    fn position(&self) -> f64;

    fn is_playing(&self) -> bool;

    /// One-shot natural end flag
    ///
    /// Returns true at most once per natural end, then resets.
    fn consume_natural_end(&self) -> bool;

    fn track_title(&self) -> String;

    fn track_artist(&self) -> String;

    /// Active subtune and subtune count
    fn subtune_cursor(&self) -> SubtuneCursor;

    /// Move to an adjacent track
    ///
    /// Returns whether a neighbour existed and playback moved to it.
    fn advance_track(&self, offset: i32, allow_wrap: bool, notify_wrap: bool) -> bool;

    /// Stop playback and unload the current track
    fn stop_and_unload(&self);
}

/// Turns a monotonically increasing event counter into a one-shot signal
///
/// For engines that expose "number of natural ends so far" instead of a
/// read-and-clear flag. A counter that goes backwards (engine restart)
/// resynchronises without firing.
#[derive(Debug, Default)]
pub struct EdgeCounter {
    last_seen: AtomicU64,
}

impl EdgeCounter {
    pub fn new(initial: u64) -> Self {
        Self {
            last_seen: AtomicU64::new(initial),
        }
    }

    /// True when `current` moved past the last observed value
    pub fn observe(&self, current: u64) -> bool {
        let previous = self.last_seen.swap(current, Ordering::AcqRel);
        current > previous
    }

    pub fn last_seen(&self) -> u64 {
        self.last_seen.load(Ordering::Acquire)
    }
}
