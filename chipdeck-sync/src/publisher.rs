//! State publisher
//!
//! [`PlaybackSink`] is the set of callbacks the reconciliation loop writes
//! derived values to. [`StatePublisher`] is the application's implementation:
//! it folds the values into [`SharedState`], broadcasts transition events
//! and forwards play records to the history store.

use chipdeck_common::time::secs_to_millis;
use chipdeck_common::{ChipdeckEvent, PlaybackState, RepeatMode, SubtuneCursor};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{trace, warn};
use uuid::Uuid;

use crate::history::HistorySender;
use crate::state::{PlaybackView, SharedState};

/// A play to add to history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayRecord {
    pub source_id: String,
    /// File path, when the source is identified by something else
    pub location_id: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
}

/// Callbacks invoked by the reconciliation loop
pub trait PlaybackSink: Send + Sync {
    fn session_started(&self, _session_id: Uuid, _file: &str) {}

    fn session_ended(&self, _session_id: Uuid, _file: &str, _cycles: u64) {}

    /// Called every cycle
    fn publish_position(&self, position_secs: f64);

    /// Called every cycle
    fn publish_duration(&self, duration_secs: f64);

    /// Called every cycle
    fn publish_playing(&self, playing: bool);

    /// Called every cycle
    fn publish_seek_state(&self, in_progress: bool, ui_busy: bool);

    fn subtune_changed(&self, cursor: SubtuneCursor);

    fn title_changed(&self, title: &str);

    fn artist_changed(&self, artist: &str);

    fn record_played(&self, record: PlayRecord);

    fn watched_source_changed(&self, source_id: &str);

    fn track_advanced(&self, _from_source_id: &str, _repeat_mode: RepeatMode) {}

    fn playback_unloaded(&self, _source_id: &str) {}
}

/// [`PlaybackSink`] backed by [`SharedState`]
pub struct StatePublisher {
    state: Arc<SharedState>,
    history: Option<HistorySender>,
}

impl StatePublisher {
    pub fn new(state: Arc<SharedState>) -> Self {
        Self {
            state,
            history: None,
        }
    }

    /// Forward play records to a history store
    pub fn with_history(mut self, history: HistorySender) -> Self {
        self.history = Some(history);
        self
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    /// Apply `f` to the view and broadcast progress when the whole-second
    /// position, duration or play state moved
    fn update_progress(&self, f: impl FnOnce(&mut PlaybackView)) {
        let mut progress = None;
        self.state.update_view(|view| {
            let before = progress_key(view);
            let old = view.clone();
            f(view);
            if progress_key(view) != before {
                progress = Some((
                    secs_to_millis(view.position_secs),
                    secs_to_millis(view.duration_secs),
                    view.state,
                ));
            }
            *view != old
        });

        if let Some((position_ms, duration_ms, state)) = progress {
            self.state.broadcast_event(ChipdeckEvent::PlaybackProgress {
                position_ms,
                duration_ms,
                state,
                timestamp: Utc::now(),
            });
        }
    }
}

fn progress_key(view: &PlaybackView) -> (u64, u64, PlaybackState) {
    (
        secs_to_millis(view.position_secs) / 1000,
        secs_to_millis(view.duration_secs),
        view.state,
    )
}

impl PlaybackSink for StatePublisher {
    fn session_started(&self, session_id: Uuid, file: &str) {
        self.state.reset_view(PlaybackView {
            session_id: Some(session_id),
            file: Some(file.to_string()),
            source_id: Some(file.to_string()),
            ..Default::default()
        });
        self.state.broadcast_event(ChipdeckEvent::SessionStarted {
            session_id,
            file: file.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn session_ended(&self, session_id: Uuid, file: &str, cycles: u64) {
        self.state.update_view(|view| {
            if view.session_id != Some(session_id) {
                return false;
            }
            view.session_id = None;
            view.state = PlaybackState::Paused;
            view.seek_in_progress = false;
            view.seek_ui_busy = false;
            true
        });
        self.state.broadcast_event(ChipdeckEvent::SessionEnded {
            session_id,
            file: file.to_string(),
            cycles,
            timestamp: Utc::now(),
        });
    }

    fn publish_position(&self, position_secs: f64) {
        self.update_progress(|view| view.position_secs = position_secs);
    }

    fn publish_duration(&self, duration_secs: f64) {
        self.update_progress(|view| view.duration_secs = duration_secs);
    }

    fn publish_playing(&self, playing: bool) {
        self.update_progress(|view| view.state = PlaybackState::from_playing(playing));
    }

    fn publish_seek_state(&self, in_progress: bool, ui_busy: bool) {
        let changed = self.state.update_view(|view| {
            if view.seek_in_progress == in_progress && view.seek_ui_busy == ui_busy {
                return false;
            }
            view.seek_in_progress = in_progress;
            view.seek_ui_busy = ui_busy;
            true
        });
        if changed {
            self.state.broadcast_event(ChipdeckEvent::SeekStateChanged {
                in_progress,
                ui_busy,
                timestamp: Utc::now(),
            });
        }
    }

    fn subtune_changed(&self, cursor: SubtuneCursor) {
        self.state.update_view(|view| {
            view.subtune = Some(cursor);
            true
        });
        self.state.broadcast_event(ChipdeckEvent::SubtuneChanged {
            cursor,
            timestamp: Utc::now(),
        });
    }

    fn title_changed(&self, title: &str) {
        self.state.update_view(|view| {
            view.title = Some(title.to_string());
            true
        });
        self.state.broadcast_event(ChipdeckEvent::MetadataChanged {
            title: Some(title.to_string()),
            artist: None,
            timestamp: Utc::now(),
        });
    }

    fn artist_changed(&self, artist: &str) {
        self.state.update_view(|view| {
            view.artist = Some(artist.to_string());
            true
        });
        self.state.broadcast_event(ChipdeckEvent::MetadataChanged {
            title: None,
            artist: Some(artist.to_string()),
            timestamp: Utc::now(),
        });
    }

    fn record_played(&self, record: PlayRecord) {
        self.state.broadcast_event(ChipdeckEvent::TrackPlayed {
            source_id: record.source_id.clone(),
            location_id: record.location_id.clone(),
            title: record.title.clone(),
            artist: record.artist.clone(),
            timestamp: Utc::now(),
        });

        if let Some(history) = &self.history {
            if history.send(record).is_err() {
                warn!("Play history store is gone, dropping record");
            }
        } else {
            trace!("No history store attached, record not persisted");
        }
    }

    fn watched_source_changed(&self, source_id: &str) {
        self.state.update_view(|view| {
            view.source_id = Some(source_id.to_string());
            true
        });
        self.state.broadcast_event(ChipdeckEvent::WatchedSourceChanged {
            source_id: source_id.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn track_advanced(&self, from_source_id: &str, repeat_mode: RepeatMode) {
        self.state.broadcast_event(ChipdeckEvent::TrackAdvanced {
            from_source_id: from_source_id.to_string(),
            repeat_mode,
            timestamp: Utc::now(),
        });
    }

    fn playback_unloaded(&self, source_id: &str) {
        self.state.broadcast_event(ChipdeckEvent::PlaybackUnloaded {
            source_id: source_id.to_string(),
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{self, PlayHistory};
    use tokio::sync::broadcast::error::TryRecvError;

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<ChipdeckEvent>) -> Vec<&'static str> {
        let mut types = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => types.push(event.event_type()),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return types,
                Err(TryRecvError::Lagged(_)) => continue,
            }
        }
    }

    #[test]
    fn test_progress_broadcast_once_per_second() {
        let state = Arc::new(SharedState::default());
        let publisher = StatePublisher::new(state.clone());
        let mut rx = state.subscribe_events();

        publisher.publish_duration(120.0);
        publisher.publish_position(0.18);
        publisher.publish_position(0.36);
        publisher.publish_position(1.02);

        assert_eq!(drain(&mut rx), vec!["PlaybackProgress", "PlaybackProgress"]);
        assert_eq!(state.view().position_secs, 1.02);
    }

    #[test]
    fn test_seek_state_broadcast_on_change_only() {
        let state = Arc::new(SharedState::default());
        let publisher = StatePublisher::new(state.clone());
        let mut rx = state.subscribe_events();

        publisher.publish_seek_state(false, false);
        publisher.publish_seek_state(true, false);
        publisher.publish_seek_state(true, false);
        publisher.publish_seek_state(true, true);
        publisher.publish_seek_state(false, false);

        assert_eq!(drain(&mut rx).len(), 3);
        assert!(!state.view().seek_ui_busy);
    }

    #[test]
    fn test_session_started_resets_view() {
        let state = Arc::new(SharedState::default());
        let publisher = StatePublisher::new(state.clone());
        publisher.title_changed("Old");

        let id = Uuid::new_v4();
        publisher.session_started(id, "/music/a.sid");

        let view = state.view();
        assert_eq!(view.session_id, Some(id));
        assert_eq!(view.file.as_deref(), Some("/music/a.sid"));
        assert_eq!(view.title, None);
    }

    #[tokio::test]
    async fn test_record_played_forwards_to_history() {
        let state = Arc::new(SharedState::default());
        let (tx, rx) = history::channel();
        let (store, handle) = PlayHistory::spawn(rx);
        let publisher = StatePublisher::new(state).with_history(tx);

        publisher.record_played(PlayRecord {
            source_id: "a.sid".to_string(),
            location_id: None,
            title: Some("Title".to_string()),
            artist: None,
        });
        drop(publisher);
        handle.await.unwrap();

        assert_eq!(store.len(), 1);
    }
}
