//! The reconciliation loop
//!
//! One loop instance runs per selected file. Each cycle reads the engine,
//! derives UI-facing values, publishes them and detects transitions:
//!
//! 1. seek flag and seek timing
//! 2. duration (held while seeking)
//! 3. position (deferred seek override, clamped)
//! 4. playing flag, then publication of all four values
//! 5. when not seeking: subtune change, watched-source change or natural
//!    end, metadata polling and history recording
//!
//! The loop ends once its file is no longer the selected one.

use chipdeck_common::human_time::format_progress;
use chipdeck_common::SubtuneCursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace};
use uuid::Uuid;

use super::metadata::{HistoryGate, MetadataPoller, PlaySignature, SourceClassifier};
use super::policy::{resolve_natural_end, NaturalEndOutcome};
use super::seek::SeekTracker;
use crate::clock::SharedClock;
use crate::config::SyncConfig;
use crate::engine::PlaybackEngine;
use crate::inputs::{SelectedFile, SessionInputs};
use crate::publisher::{PlayRecord, PlaybackSink};

/// What the loop should do after a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Sleep for the adaptive interval
    Continue { sleep: Duration },
    /// The track was advanced; run the next cycle right away
    Advanced,
}

/// Clamp an engine or deferred position into `[0, duration]`
///
/// Only the lower bound applies while the duration is unknown (zero).
pub fn clamp_position(position: f64, duration: f64) -> f64 {
    let position = if position.is_finite() {
        position.max(0.0)
    } else {
        0.0
    };
    if duration > 0.0 {
        position.min(duration)
    } else {
        position
    }
}

fn sanitize_duration(duration: f64) -> f64 {
    if duration.is_finite() && duration > 0.0 {
        duration
    } else {
        0.0
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Reconciliation loop for one selected file
pub struct ReconciliationLoop {
    session_id: Uuid,
    selection: SelectedFile,
    selection_rx: watch::Receiver<Option<SelectedFile>>,
    engine: Arc<dyn PlaybackEngine>,
    sink: Arc<dyn PlaybackSink>,
    inputs: Arc<SessionInputs>,
    clock: SharedClock,
    config: SyncConfig,
    classifier: SourceClassifier,

    seek: SeekTracker,
    poller: MetadataPoller,
    history: HistoryGate,
    watched_source: String,
    last_duration: f64,
    last_subtune: Option<SubtuneCursor>,
    cycles: u64,
}

impl ReconciliationLoop {
    pub fn new(
        session_id: Uuid,
        selection: SelectedFile,
        engine: Arc<dyn PlaybackEngine>,
        sink: Arc<dyn PlaybackSink>,
        inputs: Arc<SessionInputs>,
        clock: SharedClock,
        config: SyncConfig,
    ) -> Self {
        let mut selection_rx = inputs.subscribe_selection();
        selection_rx.borrow_and_update();

        Self {
            session_id,
            watched_source: inputs.active_source_id(&selection.path),
            selection,
            selection_rx,
            engine,
            sink,
            inputs,
            clock,
            classifier: SourceClassifier::from_config(&config),
            seek: SeekTracker::new(config.seek_busy_threshold_ms),
            poller: MetadataPoller::new(config.metadata_poll_fast_ms, config.metadata_poll_slow_ms),
            history: HistoryGate::default(),
            last_duration: 0.0,
            last_subtune: None,
            cycles: 0,
            config,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Source the loop currently treats as the track in progress
    pub fn watched_source(&self) -> &str {
        &self.watched_source
    }

    /// True while this loop's file is still the selected one
    pub fn is_current(&self) -> bool {
        self.inputs.selection().as_ref() == Some(&self.selection)
    }

    /// Run until the file is deselected; returns the number of cycles run
    pub async fn run(mut self) -> u64 {
        info!(
            "Session {} started for {} (generation {})",
            self.session_id, self.selection.path, self.selection.generation
        );
        self.sink
            .session_started(self.session_id, &self.selection.path);

        while self.is_current() {
            match self.run_cycle() {
                CycleOutcome::Advanced => {
                    tokio::task::yield_now().await;
                }
                CycleOutcome::Continue { sleep } => {
                    tokio::select! {
                        _ = tokio::time::sleep(sleep) => {}
                        changed = self.selection_rx.changed() => {
                            if changed.is_err() {
                                debug!("Selection channel closed");
                                break;
                            }
                            self.selection_rx.borrow_and_update();
                        }
                    }
                }
            }
        }

        info!(
            "Session {} ended for {} after {} cycles",
            self.session_id, self.selection.path, self.cycles
        );
        self.sink
            .session_ended(self.session_id, &self.selection.path, self.cycles);
        self.cycles
    }

    /// Run one reconciliation cycle
    pub fn run_cycle(&mut self) -> CycleOutcome {
        self.cycles += 1;
        let now = self.clock.now_ms();

        let seeking = self.engine.is_seek_in_progress();
        let seek = self
            .seek
            .observe(seeking, now, self.inputs.pending_seek_request());
        if seek.clear_request {
            self.inputs.clear_seek_request();
        }

        let duration = if seeking {
            self.last_duration
        } else {
            sanitize_duration(self.engine.duration())
        };
        self.last_duration = duration;

        let active_source = self.inputs.active_source_id(&self.selection.path);
        let position = match self.inputs.deferred_seek() {
            Some(deferred) if deferred.source_id == active_source => {
                clamp_position(deferred.position_secs, duration)
            }
            _ => clamp_position(self.engine.position(), duration),
        };

        let playing = self.engine.is_playing();

        self.sink.publish_position(position);
        self.sink.publish_duration(duration);
        self.sink.publish_playing(playing);
        self.sink.publish_seek_state(seek.in_progress, seek.ui_busy);

        trace!(
            "Cycle {}: {} playing={} seeking={} busy={}",
            self.cycles,
            format_progress(position, duration),
            playing,
            seek.in_progress,
            seek.ui_busy
        );

        let sleep = self.config.cycle_interval(playing);
        if seeking {
            return CycleOutcome::Continue { sleep };
        }

        let subtune_record = self.observe_subtune(playing);

        if let Some(outcome) = self.observe_source(&active_source) {
            return outcome;
        }

        self.poll_metadata(now, playing, &active_source, subtune_record);
        CycleOutcome::Continue { sleep }
    }

    /// Returns true when a subtune change while playing must be recorded
    /// this cycle
    fn observe_subtune(&mut self, playing: bool) -> bool {
        let cursor = self.engine.subtune_cursor();
        let Some(previous) = self.last_subtune.replace(cursor) else {
            debug!("Subtune cursor {}", cursor);
            self.sink.subtune_changed(cursor);
            return false;
        };
        if previous == cursor {
            return false;
        }

        debug!("Subtune changed {} -> {}", previous, cursor);
        self.sink.subtune_changed(cursor);
        if playing {
            self.poller.force_due();
        }
        playing
    }

    fn observe_source(&mut self, active_source: &str) -> Option<CycleOutcome> {
        if active_source != self.watched_source {
            info!(
                "Watched source changed: {} -> {}",
                self.watched_source, active_source
            );
            self.watched_source = active_source.to_string();
            self.sink.watched_source_changed(active_source);
            self.poller.force_due();
            return None;
        }

        if !self.engine.consume_natural_end() {
            return None;
        }

        let mode = self.inputs.repeat_mode();
        info!("Natural end of {} (repeat {})", self.watched_source, mode);
        match resolve_natural_end(self.engine.as_ref(), mode) {
            NaturalEndOutcome::Advanced => {
                self.sink.track_advanced(&self.watched_source, mode);
                Some(CycleOutcome::Advanced)
            }
            NaturalEndOutcome::Unloaded => {
                self.sink.playback_unloaded(&self.watched_source);
                None
            }
            NaturalEndOutcome::Held => None,
        }
    }

    fn poll_metadata(&mut self, now: i64, playing: bool, active_source: &str, subtune_record: bool) {
        if self.poller.tick(now) {
            let raw_title = self.engine.track_title();
            let title = self
                .classifier
                .sanitize_title(&raw_title, active_source)
                .into_owned();
            let artist = self.engine.track_artist();

            let change = self.poller.apply(title, artist);
            if let Some(title) = &change.title {
                debug!("Title changed: {:?}", title);
                self.sink.title_changed(title);
            }
            if let Some(artist) = &change.artist {
                debug!("Artist changed: {:?}", artist);
                self.sink.artist_changed(artist);
            }
        }

        if !playing {
            return;
        }

        let signature =
            PlaySignature::new(active_source, self.poller.title(), self.poller.artist());
        if subtune_record {
            self.history.remember(signature);
        } else if !signature.has_text() || !self.history.offer(signature) {
            return;
        }

        let location_id =
            (active_source != self.selection.path).then(|| self.selection.path.clone());
        let record = PlayRecord {
            source_id: active_source.to_string(),
            location_id,
            title: non_blank(self.poller.title()),
            artist: non_blank(self.poller.artist()),
        };
        info!(
            "Recording play of {} ({})",
            record.title.as_deref().unwrap_or("<untitled>"),
            record.source_id
        );
        self.sink.record_played(record);
    }
}
