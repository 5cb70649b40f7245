//! Playback state reconciliation
//!
//! The loop itself lives in [`reconcile`]; the pieces it folds engine reads
//! through (seek debouncing, metadata polling, repeat policy) are kept
//! separate so they can be tested without an engine.

pub mod metadata;
pub mod policy;
pub mod reconcile;
pub mod seek;
pub mod session;

pub use metadata::{HistoryGate, MetadataPoller, PlaySignature, SourceClassifier, SourceKind};
pub use policy::{decide, resolve_natural_end, AdvanceAction, NaturalEndOutcome};
pub use reconcile::{clamp_position, CycleOutcome, ReconciliationLoop};
pub use seek::{SeekTracker, SeekUpdate};
pub use session::{SessionDeps, SessionSupervisor};
