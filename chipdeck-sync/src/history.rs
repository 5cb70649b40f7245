//! In-memory play history
//!
//! Play records arrive over an unbounded channel from the state publisher and
//! are appended by a background task, so the reconciliation loop never waits
//! on the store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::publisher::PlayRecord;

/// A recorded play
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: PlayRecord,
    pub played_at: DateTime<Utc>,
}

pub type HistorySender = mpsc::UnboundedSender<PlayRecord>;

/// Create the channel feeding [`PlayHistory::spawn`]
pub fn channel() -> (HistorySender, mpsc::UnboundedReceiver<PlayRecord>) {
    mpsc::unbounded_channel()
}

/// Handle to the history store
#[derive(Clone, Default)]
pub struct PlayHistory {
    entries: Arc<Mutex<Vec<HistoryEntry>>>,
}

impl PlayHistory {
    /// Spawn the background task draining `records`
    ///
    /// The task exits once every sender is dropped.
    pub fn spawn(mut records: mpsc::UnboundedReceiver<PlayRecord>) -> (Self, JoinHandle<()>) {
        let history = Self::default();
        let store = history.clone();

        let handle = tokio::spawn(async move {
            while let Some(record) = records.recv().await {
                store.append(record);
            }
            info!("Play history channel closed, {} entries recorded", store.len());
        });

        (history, handle)
    }

    fn append(&self, record: PlayRecord) {
        debug!(
            "History: {} ({})",
            record.title.as_deref().unwrap_or("<untitled>"),
            record.source_id
        );
        self.lock().push(HistoryEntry {
            record,
            played_at: Utc::now(),
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<HistoryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
