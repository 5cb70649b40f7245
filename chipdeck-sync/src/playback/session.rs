//! Session supervision
//!
//! Watches the selected file and keeps exactly one [`ReconciliationLoop`]
//! running for it. A new selection (including re-selecting the same path)
//! waits for the previous loop to finish before the next one starts, so no
//! tracking state crosses sessions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::reconcile::ReconciliationLoop;
use crate::clock::SharedClock;
use crate::config::SyncConfig;
use crate::engine::PlaybackEngine;
use crate::error::{Error, Result};
use crate::inputs::SessionInputs;
use crate::publisher::PlaybackSink;

/// Collaborators handed to every session
#[derive(Clone)]
pub struct SessionDeps {
    pub engine: Arc<dyn PlaybackEngine>,
    pub sink: Arc<dyn PlaybackSink>,
    pub inputs: Arc<SessionInputs>,
    pub clock: SharedClock,
    pub config: SyncConfig,
}

/// Starts and stops reconciliation loops as the selection changes
pub struct SessionSupervisor {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
    sessions_started: Arc<AtomicU64>,
}

impl SessionSupervisor {
    /// Spawn the supervisor task; a file already selected starts a session immediately
    pub fn spawn(deps: SessionDeps) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sessions_started = Arc::new(AtomicU64::new(0));
        let handle = tokio::spawn(supervise(deps, shutdown_rx, sessions_started.clone()));

        Self {
            shutdown_tx,
            handle,
            sessions_started,
        }
    }

    /// Number of sessions started so far
    pub fn sessions_started(&self) -> u64 {
        self.sessions_started.load(Ordering::Relaxed)
    }

    /// Stop supervising and abort the active session, if any
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);
        self.handle
            .await
            .map_err(|e| Error::Session(format!("supervisor task failed: {}", e)))
    }
}

async fn supervise(
    deps: SessionDeps,
    mut shutdown_rx: watch::Receiver<bool>,
    sessions_started: Arc<AtomicU64>,
) {
    let mut selection_rx = deps.inputs.subscribe_selection();
    let mut current: Option<JoinHandle<u64>> = None;

    loop {
        let selected = selection_rx.borrow_and_update().clone();

        if let Some(previous) = current.take() {
            join_session(previous).await;
        }

        if let Some(selection) = selected {
            let session_id = Uuid::new_v4();
            sessions_started.fetch_add(1, Ordering::Relaxed);
            let session = ReconciliationLoop::new(
                session_id,
                selection,
                deps.engine.clone(),
                deps.sink.clone(),
                deps.inputs.clone(),
                deps.clock.clone(),
                deps.config.clone(),
            );
            current = Some(tokio::spawn(session.run()));
        } else {
            debug!("No file selected, idle");
        }

        tokio::select! {
            changed = selection_rx.changed() => {
                if changed.is_err() {
                    debug!("Selection channel closed");
                    break;
                }
            }
            _ = shutdown_rx.changed() => {
                info!("Session supervisor shutting down");
                break;
            }
        }
    }

    if let Some(active) = current.take() {
        active.abort();
        let _ = active.await;
    }
}

async fn join_session(handle: JoinHandle<u64>) {
    match handle.await {
        Ok(cycles) => debug!("Previous session finished after {} cycles", cycles),
        Err(e) if e.is_panic() => error!("Session task panicked: {}", e),
        Err(e) => debug!("Session task cancelled: {}", e),
    }
}
