//! Millisecond clock used for seek and metadata timing
//!
//! Timestamps are plain `i64` milliseconds since an arbitrary origin. Only
//! differences between two readings of the same clock are meaningful, so the
//! loop and whoever stamps seek requests must share one clock instance.

use std::sync::Arc;
use tokio::time::Instant;

/// Source of monotonic millisecond timestamps
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Shared clock handle
pub type SharedClock = Arc<dyn Clock>;

/// Clock backed by `tokio::time::Instant`
///
/// Follows tokio's paused test clock, which makes timing behaviour
/// deterministic under `#[tokio::test(start_paused = true)]`.
#[derive(Debug, Clone)]
pub struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn shared() -> SharedClock {
        Arc::new(Self::new())
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> i64 {
        i64::try_from(self.origin.elapsed().as_millis()).unwrap_or(i64::MAX)
    }
}
