//! Test helpers for chipdeck-sync integration tests
//!
//! - ScriptedEngine: engine whose reads are set directly by the test
//! - RecordingSink: records every callback in order
//! - ManualClock: clock advanced by hand

#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use chipdeck_common::{RepeatMode, SubtuneCursor};
use chipdeck_sync::{Clock, PlayRecord, PlaybackEngine, PlaybackSink};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: i64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct ScriptState {
    pub seeking: bool,
    pub duration: f64,
    pub position: f64,
    pub playing: bool,
    pub natural_end: bool,
    pub title: String,
    pub artist: String,
    pub cursor: SubtuneCursor,
    pub advance_succeeds: bool,
    pub advance_calls: Vec<(i32, bool, bool)>,
    pub unload_calls: u32,
    pub natural_end_reads: u32,
    pub title_reads: u32,
}

/// Engine whose every read comes from [`ScriptState`]
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    state: Mutex<ScriptState>,
}

impl ScriptedEngine {
    pub fn new() -> Arc<Self> {
        let engine = Self::default();
        engine.script(|s| s.cursor = SubtuneCursor::new(0, 1));
        Arc::new(engine)
    }

    /// Mutate the script
    pub fn script(&self, f: impl FnOnce(&mut ScriptState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn read<R>(&self, f: impl FnOnce(&ScriptState) -> R) -> R {
        f(&self.state.lock().unwrap())
    }

    pub fn playing_track(&self, title: &str, artist: &str, duration: f64) {
        self.script(|s| {
            s.playing = true;
            s.title = title.to_string();
            s.artist = artist.to_string();
            s.duration = duration;
        });
    }

    pub fn advance_calls(&self) -> Vec<(i32, bool, bool)> {
        self.read(|s| s.advance_calls.clone())
    }

    pub fn unload_calls(&self) -> u32 {
        self.read(|s| s.unload_calls)
    }
}

impl PlaybackEngine for ScriptedEngine {
    fn is_seek_in_progress(&self) -> bool {
        self.read(|s| s.seeking)
    }

    fn duration(&self) -> f64 {
        self.read(|s| s.duration)
    }

    fn position(&self) -> f64 {
        self.read(|s| s.position)
    }

    fn is_playing(&self) -> bool {
        self.read(|s| s.playing)
    }

    fn consume_natural_end(&self) -> bool {
        let mut s = self.state.lock().unwrap();
        s.natural_end_reads += 1;
        std::mem::take(&mut s.natural_end)
    }

    fn track_title(&self) -> String {
        let mut s = self.state.lock().unwrap();
        s.title_reads += 1;
        s.title.clone()
    }

    fn track_artist(&self) -> String {
        self.read(|s| s.artist.clone())
    }

    fn subtune_cursor(&self) -> SubtuneCursor {
        self.read(|s| s.cursor)
    }

    fn advance_track(&self, offset: i32, allow_wrap: bool, notify_wrap: bool) -> bool {
        let mut s = self.state.lock().unwrap();
        s.advance_calls.push((offset, allow_wrap, notify_wrap));
        s.advance_succeeds
    }

    fn stop_and_unload(&self) {
        let mut s = self.state.lock().unwrap();
        s.unload_calls += 1;
        s.playing = false;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    SessionStarted(Uuid, String),
    SessionEnded(Uuid, String, u64),
    Position(f64),
    Duration(f64),
    Playing(bool),
    SeekState { in_progress: bool, ui_busy: bool },
    Subtune(SubtuneCursor),
    Title(String),
    Artist(String),
    Played(PlayRecord),
    Watched(String),
    Advanced(String, RepeatMode),
    Unloaded(String),
}

/// Sink that records every callback
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, call: SinkCall) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn collect<T>(&self, f: impl Fn(&SinkCall) -> Option<T>) -> Vec<T> {
        self.calls.lock().unwrap().iter().filter_map(f).collect()
    }

    pub fn positions(&self) -> Vec<f64> {
        self.collect(|c| match c {
            SinkCall::Position(p) => Some(*p),
            _ => None,
        })
    }

    pub fn durations(&self) -> Vec<f64> {
        self.collect(|c| match c {
            SinkCall::Duration(d) => Some(*d),
            _ => None,
        })
    }

    /// (in_progress, ui_busy) per cycle
    pub fn seek_states(&self) -> Vec<(bool, bool)> {
        self.collect(|c| match c {
            SinkCall::SeekState {
                in_progress,
                ui_busy,
            } => Some((*in_progress, *ui_busy)),
            _ => None,
        })
    }

    pub fn subtunes(&self) -> Vec<SubtuneCursor> {
        self.collect(|c| match c {
            SinkCall::Subtune(cursor) => Some(*cursor),
            _ => None,
        })
    }

    pub fn titles(&self) -> Vec<String> {
        self.collect(|c| match c {
            SinkCall::Title(t) => Some(t.clone()),
            _ => None,
        })
    }

    pub fn artists(&self) -> Vec<String> {
        self.collect(|c| match c {
            SinkCall::Artist(a) => Some(a.clone()),
            _ => None,
        })
    }

    pub fn played(&self) -> Vec<PlayRecord> {
        self.collect(|c| match c {
            SinkCall::Played(r) => Some(r.clone()),
            _ => None,
        })
    }

    pub fn watched(&self) -> Vec<String> {
        self.collect(|c| match c {
            SinkCall::Watched(s) => Some(s.clone()),
            _ => None,
        })
    }

    pub fn count(&self, f: impl Fn(&SinkCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| f(c)).count()
    }
}

impl PlaybackSink for RecordingSink {
    fn session_started(&self, session_id: Uuid, file: &str) {
        self.push(SinkCall::SessionStarted(session_id, file.to_string()));
    }

    fn session_ended(&self, session_id: Uuid, file: &str, cycles: u64) {
        self.push(SinkCall::SessionEnded(session_id, file.to_string(), cycles));
    }

    fn publish_position(&self, position_secs: f64) {
        self.push(SinkCall::Position(position_secs));
    }

    fn publish_duration(&self, duration_secs: f64) {
        self.push(SinkCall::Duration(duration_secs));
    }

    fn publish_playing(&self, playing: bool) {
        self.push(SinkCall::Playing(playing));
    }

    fn publish_seek_state(&self, in_progress: bool, ui_busy: bool) {
        self.push(SinkCall::SeekState {
            in_progress,
            ui_busy,
        });
    }

    fn subtune_changed(&self, cursor: SubtuneCursor) {
        self.push(SinkCall::Subtune(cursor));
    }

    fn title_changed(&self, title: &str) {
        self.push(SinkCall::Title(title.to_string()));
    }

    fn artist_changed(&self, artist: &str) {
        self.push(SinkCall::Artist(artist.to_string()));
    }

    fn record_played(&self, record: PlayRecord) {
        self.push(SinkCall::Played(record));
    }

    fn watched_source_changed(&self, source_id: &str) {
        self.push(SinkCall::Watched(source_id.to_string()));
    }

    fn track_advanced(&self, from_source_id: &str, repeat_mode: RepeatMode) {
        self.push(SinkCall::Advanced(from_source_id.to_string(), repeat_mode));
    }

    fn playback_unloaded(&self, source_id: &str) {
        self.push(SinkCall::Unloaded(source_id.to_string()));
    }
}
