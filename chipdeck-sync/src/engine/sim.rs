//! Deterministic in-process playback engine
//!
//! Stands in for a native decoder process: it keeps a playlist, advances the
//! position against the shared clock, emulates seek latency and late-arriving
//! metadata, and counts natural ends the way engines without a read-and-clear
//! flag do. Advancing or unloading updates the session selection the way an
//! application shell would.

use chipdeck_common::{RepeatMode, SubtuneCursor};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use super::{EdgeCounter, PlaybackEngine};
use crate::clock::SharedClock;
use crate::inputs::{DeferredSeek, SessionInputs};

const DEFAULT_SEEK_LATENCY_MS: i64 = 120;

/// A playlist entry
#[derive(Debug, Clone, PartialEq)]
pub struct SimTrack {
    pub path: String,
    /// Embedded title; `None` makes the engine report the file name instead
    pub title: Option<String>,
    pub artist: String,
    pub duration_secs: f64,
    pub subtunes: i32,
}

impl SimTrack {
    pub fn new(path: impl Into<String>, duration_secs: f64) -> Self {
        Self {
            path: path.into(),
            title: None,
            artist: String::new(),
            duration_secs,
            subtunes: 1,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    pub fn with_subtunes(mut self, subtunes: i32) -> Self {
        self.subtunes = subtunes.max(1);
        self
    }

    /// Title as a native engine reports it: embedded tag or last path segment
    fn reported_title(&self) -> String {
        match &self.title {
            Some(title) => title.clone(),
            None => self
                .path
                .rsplit(&['/', '\\'][..])
                .next()
                .unwrap_or(&self.path)
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingSeek {
    target: f64,
    completes_at_ms: i64,
}

#[derive(Debug)]
struct SimState {
    playlist: Vec<SimTrack>,
    current: Option<usize>,
    position: f64,
    playing: bool,
    subtune: i32,
    seek: Option<PendingSeek>,
    natural_ends: u64,
    wraps: u64,
    loaded_at_ms: i64,
    last_update_ms: i64,
}

impl SimState {
    fn track(&self) -> Option<&SimTrack> {
        self.current.and_then(|i| self.playlist.get(i))
    }

    /// Advance simulated playback to `now_ms`; returns true when a seek finished
    fn catch_up(&mut self, now_ms: i64, repeat_mode: RepeatMode) -> bool {
        let mut elapsed_ms = (now_ms - self.last_update_ms).max(0);
        self.last_update_ms = now_ms;

        let mut seek_finished = false;
        if let Some(seek) = self.seek {
            if now_ms < seek.completes_at_ms {
                return false;
            }
            self.position = seek.target;
            self.seek = None;
            seek_finished = true;
            elapsed_ms = now_ms - seek.completes_at_ms;
        }

        let Some(duration) = self.track().map(|t| t.duration_secs) else {
            return seek_finished;
        };

        if self.playing {
            self.position += elapsed_ms as f64 / 1000.0;
            if self.position >= duration {
                self.natural_ends += 1;
                if repeat_mode == RepeatMode::Track {
                    self.position = 0.0;
                } else {
                    self.position = duration;
                    self.playing = false;
                }
            }
        }

        seek_finished
    }
}

/// Simulated engine implementing [`PlaybackEngine`]
pub struct SimulatedEngine {
    state: Mutex<SimState>,
    ends: EdgeCounter,
    inputs: Arc<SessionInputs>,
    clock: SharedClock,
    seek_latency_ms: i64,
    metadata_delay_ms: i64,
}

impl SimulatedEngine {
    pub fn new(playlist: Vec<SimTrack>, inputs: Arc<SessionInputs>, clock: SharedClock) -> Self {
        let now = clock.now_ms();
        Self {
            state: Mutex::new(SimState {
                playlist,
                current: None,
                position: 0.0,
                playing: false,
                subtune: 0,
                seek: None,
                natural_ends: 0,
                wraps: 0,
                loaded_at_ms: now,
                last_update_ms: now,
            }),
            ends: EdgeCounter::new(0),
            inputs,
            clock,
            seek_latency_ms: DEFAULT_SEEK_LATENCY_MS,
            metadata_delay_ms: 0,
        }
    }

    /// How long a seek keeps the engine busy
    pub fn with_seek_latency(mut self, latency_ms: i64) -> Self {
        self.seek_latency_ms = latency_ms.max(0);
        self
    }

    /// How long after loading the title and artist read as blank
    pub fn with_metadata_delay(mut self, delay_ms: i64) -> Self {
        self.metadata_delay_ms = delay_ms.max(0);
        self
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut SimState, i64) -> R) -> R {
        let now = self.clock.now_ms();
        let repeat_mode = self.inputs.repeat_mode();
        let (result, seek_finished) = {
            let mut state = self.lock();
            let finished = state.catch_up(now, repeat_mode);
            (f(&mut state, now), finished)
        };
        if seek_finished {
            debug!("Simulated seek finished");
            self.inputs.set_deferred_seek(None);
        }
        result
    }

    /// Load playlist entry `index` and start playing it
    pub fn load(&self, index: usize) -> bool {
        let path = self.with_state(|state, now| {
            let path = state.playlist.get(index)?.path.clone();
            state.current = Some(index);
            state.position = 0.0;
            state.playing = true;
            state.subtune = 0;
            state.seek = None;
            state.loaded_at_ms = now;
            Some(path)
        });

        let Some(path) = path else {
            return false;
        };

        info!("Simulated engine loaded track {}: {}", index, path);
        self.inputs.set_source_id(None);
        self.inputs.set_deferred_seek(None);
        self.inputs.select_file(Some(path));
        true
    }

    pub fn play(&self) {
        self.with_state(|state, _| {
            if state.current.is_some() {
                state.playing = true;
            }
        });
    }

    pub fn pause(&self) {
        self.with_state(|state, _| state.playing = false);
    }

    /// Start a seek, stamping the request and asserting a deferred position
    pub fn seek(&self, target_secs: f64) -> bool {
        let started = self.with_state(|state, now| {
            let track = state.track()?;
            let target = target_secs.clamp(0.0, track.duration_secs.max(0.0));
            let path = track.path.clone();
            state.seek = Some(PendingSeek {
                target,
                completes_at_ms: now + self.seek_latency_ms,
            });
            Some((path, target, now))
        });

        let Some((path, target, now)) = started else {
            return false;
        };

        self.inputs.mark_seek_requested(now);
        let source = self.inputs.active_source_id(&path);
        self.inputs
            .set_deferred_seek(Some(DeferredSeek::new(source, target)));
        true
    }

    /// Jump to another subtune of the loaded file
    pub fn select_subtune(&self, index: i32) {
        self.with_state(|state, _| {
            if let Some(count) = state.track().map(|t| t.subtunes) {
                state.subtune = index.clamp(0, count - 1);
                state.position = 0.0;
            }
        });
    }

    pub fn current_index(&self) -> Option<usize> {
        self.lock().current
    }

    /// Number of wraparounds announced with `notify_wrap`
    pub fn wrap_notifications(&self) -> u64 {
        self.lock().wraps
    }
}

impl PlaybackEngine for SimulatedEngine {
    fn is_seek_in_progress(&self) -> bool {
        self.with_state(|state, _| state.seek.is_some())
    }

    fn duration(&self) -> f64 {
        self.with_state(|state, _| state.track().map(|t| t.duration_secs).unwrap_or(0.0))
    }

    fn position(&self) -> f64 {
        self.with_state(|state, _| state.position)
    }

    fn is_playing(&self) -> bool {
        self.with_state(|state, _| state.playing)
    }

    fn consume_natural_end(&self) -> bool {
        let count = self.with_state(|state, _| state.natural_ends);
        self.ends.observe(count)
    }

    fn track_title(&self) -> String {
        let delay = self.metadata_delay_ms;
        self.with_state(|state, now| {
            if now - state.loaded_at_ms < delay {
                return String::new();
            }
            state.track().map(SimTrack::reported_title).unwrap_or_default()
        })
    }

    fn track_artist(&self) -> String {
        let delay = self.metadata_delay_ms;
        self.with_state(|state, now| {
            if now - state.loaded_at_ms < delay {
                return String::new();
            }
            state.track().map(|t| t.artist.clone()).unwrap_or_default()
        })
    }

    fn subtune_cursor(&self) -> SubtuneCursor {
        self.with_state(|state, _| {
            let count = state.track().map(|t| t.subtunes).unwrap_or(0);
            SubtuneCursor::new(state.subtune, count)
        })
    }

    fn advance_track(&self, offset: i32, allow_wrap: bool, notify_wrap: bool) -> bool {
        let target = self.with_state(|state, _| {
            let current = state.current? as i64;
            let len = state.playlist.len() as i64;
            let mut target = current + offset as i64;
            if !(0..len).contains(&target) {
                if !allow_wrap || len == 0 {
                    return None;
                }
                target = target.rem_euclid(len);
                if notify_wrap {
                    state.wraps += 1;
                    info!("Playlist wrapped around ({} wraps so far)", state.wraps);
                }
            }
            Some(target as usize)
        });

        match target {
            Some(index) => self.load(index),
            None => false,
        }
    }

    fn stop_and_unload(&self) {
        self.with_state(|state, _| {
            state.current = None;
            state.playing = false;
            state.position = 0.0;
            state.seek = None;
        });
        info!("Simulated engine stopped and unloaded");
        self.inputs.set_deferred_seek(None);
        self.inputs.select_file(None);
    }
}
