//! Shared playback state
//!
//! Holds the UI-observable view of the current session plus the event bus
//! observers subscribe to.

use chipdeck_common::{ChipdeckEvent, EventBus, PlaybackState, SubtuneCursor};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

/// Snapshot of everything a UI renders for the current session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaybackView {
    pub session_id: Option<Uuid>,
    /// Selected file path
    pub file: Option<String>,
    /// Watched source id (explicit id or file path)
    pub source_id: Option<String>,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub state: PlaybackState,
    pub seek_in_progress: bool,
    pub seek_ui_busy: bool,
    pub subtune: Option<SubtuneCursor>,
    pub title: Option<String>,
    pub artist: Option<String>,
}

/// Shared state accessible by the loop, the publisher and observers
pub struct SharedState {
    view: watch::Sender<PlaybackView>,
    events: EventBus,
}

impl SharedState {
    pub fn new(event_capacity: usize) -> Self {
        let (view, _) = watch::channel(PlaybackView::default());
        Self {
            view,
            events: EventBus::new(event_capacity),
        }
    }

    /// Current view (cloned)
    pub fn view(&self) -> PlaybackView {
        self.view.borrow().clone()
    }

    pub fn subscribe_view(&self) -> watch::Receiver<PlaybackView> {
        self.view.subscribe()
    }

    /// Mutate the view; watchers are woken only when `f` returns true
    pub fn update_view(&self, f: impl FnOnce(&mut PlaybackView) -> bool) -> bool {
        self.view.send_if_modified(f)
    }

    /// Replace the whole view, e.g. when a new session starts
    pub fn reset_view(&self, view: PlaybackView) {
        self.view.send_replace(view);
    }

    /// Broadcast an event; having no subscribers is fine
    pub fn broadcast_event(&self, event: ChipdeckEvent) {
        self.events.emit_lossy(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ChipdeckEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(256)
    }
}
