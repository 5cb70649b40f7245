//! Externally mutated session inputs
//!
//! Other parts of the application (transport controls, playlist, seek bar)
//! write these values. The reconciliation loop only reads them, except for
//! the pending seek-request timestamp, which it consumes.

use chipdeck_common::RepeatMode;
use std::sync::{Mutex, PoisonError, RwLock};
use tokio::sync::watch;

/// A file selection
///
/// `generation` increases on every selection, so re-selecting the same path
/// still counts as a new session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: String,
    pub generation: u64,
}

/// Optimistic position override pending engine catch-up
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredSeek {
    /// Source the override applies to
    pub source_id: String,
    /// Asserted position in seconds
    pub position_secs: f64,
}

impl DeferredSeek {
    pub fn new(source_id: impl Into<String>, position_secs: f64) -> Self {
        Self {
            source_id: source_id.into(),
            position_secs,
        }
    }
}

/// Inputs shared between the application and the active session
pub struct SessionInputs {
    selection: watch::Sender<Option<SelectedFile>>,
    generation: Mutex<u64>,
    source_id: RwLock<Option<String>>,
    deferred_seek: RwLock<Option<DeferredSeek>>,
    seek_requested_at_ms: Mutex<Option<i64>>,
    repeat_mode: RwLock<RepeatMode>,
}

impl SessionInputs {
    pub fn new(repeat_mode: RepeatMode) -> Self {
        let (selection, _) = watch::channel(None);
        Self {
            selection,
            generation: Mutex::new(0),
            source_id: RwLock::new(None),
            deferred_seek: RwLock::new(None),
            seek_requested_at_ms: Mutex::new(None),
            repeat_mode: RwLock::new(repeat_mode),
        }
    }

    /// Select a file (starting a new session), or clear the selection with `None`
    pub fn select_file(&self, path: Option<String>) -> Option<SelectedFile> {
        let selected = path.map(|path| {
            let mut generation = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
            *generation += 1;
            SelectedFile {
                path,
                generation: *generation,
            }
        });
        self.selection.send_replace(selected.clone());
        selected
    }

    /// Current selection
    pub fn selection(&self) -> Option<SelectedFile> {
        self.selection.borrow().clone()
    }

    /// Watch selection changes
    pub fn subscribe_selection(&self) -> watch::Receiver<Option<SelectedFile>> {
        self.selection.subscribe()
    }

    /// Explicit source id, when the application set one
    pub fn source_id(&self) -> Option<String> {
        self.source_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_source_id(&self, source_id: Option<String>) {
        *self.source_id.write().unwrap_or_else(PoisonError::into_inner) = source_id;
    }

    /// Active source id: the explicit id if set, else the file path
    pub fn active_source_id(&self, file_path: &str) -> String {
        self.source_id()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| file_path.to_string())
    }

    pub fn deferred_seek(&self) -> Option<DeferredSeek> {
        self.deferred_seek
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_deferred_seek(&self, seek: Option<DeferredSeek>) {
        *self
            .deferred_seek
            .write()
            .unwrap_or_else(PoisonError::into_inner) = seek;
    }

    /// Record that a seek was requested at `at_ms` (same clock as the loop)
    pub fn mark_seek_requested(&self, at_ms: i64) {
        *self
            .seek_requested_at_ms
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(at_ms);
    }

    /// Pending seek-request timestamp, if any
    pub fn pending_seek_request(&self) -> Option<i64> {
        *self
            .seek_requested_at_ms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn clear_seek_request(&self) {
        *self
            .seek_requested_at_ms
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        *self.repeat_mode.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_repeat_mode(&self, mode: RepeatMode) {
        *self
            .repeat_mode
            .write()
            .unwrap_or_else(PoisonError::into_inner) = mode;
    }
}

impl Default for SessionInputs {
    fn default() -> Self {
        Self::new(RepeatMode::default())
    }
}
