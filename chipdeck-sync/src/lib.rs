//! chipdeck-sync library
//!
//! Keeps application-visible playback state in step with an opaque playback
//! engine that can only be polled.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod inputs;
pub mod playback;
pub mod publisher;
pub mod state;

pub use clock::{Clock, SharedClock, TokioClock};
pub use config::{SyncConfig, TomlConfig};
pub use engine::{EdgeCounter, PlaybackEngine, SimTrack, SimulatedEngine};
pub use error::{Error, Result};
pub use inputs::{DeferredSeek, SelectedFile, SessionInputs};
pub use playback::{CycleOutcome, ReconciliationLoop, SessionDeps, SessionSupervisor};
pub use publisher::{PlayRecord, PlaybackSink, StatePublisher};
pub use state::{PlaybackView, SharedState};
