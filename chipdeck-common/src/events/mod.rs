//! Event types for the chipdeck event system
//!
//! Provides shared event definitions and the EventBus used by the state
//! publisher to fan playback transitions out to observers.

mod playback_types;

pub use playback_types::{PlaybackState, RepeatMode, SubtuneCursor};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// chipdeck event types
///
/// Events are broadcast via EventBus and serialize to tagged JSON for
/// observers that log or forward them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ChipdeckEvent {
    /// A reconciliation session started for a newly selected file
    SessionStarted {
        session_id: Uuid,
        file: String,
        timestamp: DateTime<Utc>,
    },

    /// A reconciliation session ended (selection cleared or replaced)
    SessionEnded {
        session_id: Uuid,
        file: String,
        /// Number of completed polling cycles
        cycles: u64,
        timestamp: DateTime<Utc>,
    },

    /// Playback progress update
    ///
    /// Emitted when the whole-second position or the playing flag changes,
    /// not on every cycle.
    PlaybackProgress {
        position_ms: u64,
        duration_ms: u64,
        state: PlaybackState,
        timestamp: DateTime<Utc>,
    },

    /// Seek started, ended, or crossed the UI-busy threshold
    SeekStateChanged {
        in_progress: bool,
        ui_busy: bool,
        timestamp: DateTime<Utc>,
    },

    /// Subtune cursor moved or the subtune count changed
    SubtuneChanged {
        cursor: SubtuneCursor,
        timestamp: DateTime<Utc>,
    },

    /// Track title and/or artist changed
    ///
    /// Fields that did not change are `None`.
    MetadataChanged {
        title: Option<String>,
        artist: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A play was recorded to history
    TrackPlayed {
        source_id: String,
        location_id: Option<String>,
        title: Option<String>,
        artist: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// The track in progress changed outside the loop's control
    WatchedSourceChanged {
        source_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Natural end advanced to an adjacent track
    TrackAdvanced {
        from_source_id: String,
        repeat_mode: RepeatMode,
        timestamp: DateTime<Utc>,
    },

    /// Natural end at playlist end stopped and unloaded playback
    PlaybackUnloaded {
        source_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl ChipdeckEvent {
    /// Event type name, matching the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            ChipdeckEvent::SessionStarted { .. } => "SessionStarted",
            ChipdeckEvent::SessionEnded { .. } => "SessionEnded",
            ChipdeckEvent::PlaybackProgress { .. } => "PlaybackProgress",
            ChipdeckEvent::SeekStateChanged { .. } => "SeekStateChanged",
            ChipdeckEvent::SubtuneChanged { .. } => "SubtuneChanged",
            ChipdeckEvent::MetadataChanged { .. } => "MetadataChanged",
            ChipdeckEvent::TrackPlayed { .. } => "TrackPlayed",
            ChipdeckEvent::WatchedSourceChanged { .. } => "WatchedSourceChanged",
            ChipdeckEvent::TrackAdvanced { .. } => "TrackAdvanced",
            ChipdeckEvent::PlaybackUnloaded { .. } => "PlaybackUnloaded",
        }
    }

    /// When the event was created
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ChipdeckEvent::SessionStarted { timestamp, .. }
            | ChipdeckEvent::SessionEnded { timestamp, .. }
            | ChipdeckEvent::PlaybackProgress { timestamp, .. }
            | ChipdeckEvent::SeekStateChanged { timestamp, .. }
            | ChipdeckEvent::SubtuneChanged { timestamp, .. }
            | ChipdeckEvent::MetadataChanged { timestamp, .. }
            | ChipdeckEvent::TrackPlayed { timestamp, .. }
            | ChipdeckEvent::WatchedSourceChanged { timestamp, .. }
            | ChipdeckEvent::TrackAdvanced { timestamp, .. }
            | ChipdeckEvent::PlaybackUnloaded { timestamp, .. } => *timestamp,
        }
    }
}

/// One-to-many event distribution over `tokio::sync::broadcast`
///
/// Slow subscribers lose the oldest events once `capacity` is exceeded.
pub struct EventBus {
    tx: broadcast::Sender<ChipdeckEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use chipdeck_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// assert_eq!(event_bus.capacity(), 256);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ChipdeckEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ChipdeckEvent,
    ) -> Result<usize, broadcast::error::SendError<ChipdeckEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the case where nobody is listening
    pub fn emit_lossy(&self, event: ChipdeckEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
