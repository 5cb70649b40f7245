//! Seek tracking and UI-busy debouncing
//!
//! The engine only tells us *whether* a seek is in progress. The tracker
//! remembers when it started so the UI can show a busy indicator for slow
//! seeks without flickering on fast ones.

use tracing::debug;

/// Result of observing one cycle's seek flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekUpdate {
    /// Seek in progress this cycle
    pub in_progress: bool,
    /// Seek has run long enough to show a busy indicator
    pub ui_busy: bool,
    /// The pending seek-request timestamp must be cleared
    pub clear_request: bool,
}

/// Per-session seek state
#[derive(Debug, Clone)]
pub struct SeekTracker {
    in_progress: bool,
    started_at_ms: Option<i64>,
    ui_busy_threshold_ms: i64,
}

impl SeekTracker {
    pub fn new(ui_busy_threshold_ms: i64) -> Self {
        Self {
            in_progress: false,
            started_at_ms: None,
            ui_busy_threshold_ms,
        }
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    /// Start timestamp; set only while a seek is in progress
    pub fn started_at_ms(&self) -> Option<i64> {
        self.started_at_ms
    }

    /// Fold this cycle's engine seek flag into the tracking state
    ///
    /// `pending_request` is the timestamp of an explicitly requested seek, if
    /// the request path recorded one. Seeks started some other way are stamped
    /// with `now_ms`.
    pub fn observe(&mut self, seeking: bool, now_ms: i64, pending_request: Option<i64>) -> SeekUpdate {
        let mut clear_request = false;

        if seeking {
            if !self.in_progress {
                let started = match pending_request {
                    Some(requested_at) => {
                        clear_request = true;
                        requested_at
                    }
                    None => now_ms,
                };
                self.started_at_ms = Some(started);
                debug!(
                    "Seek started (stamped {}ms, explicit request: {})",
                    started, clear_request
                );
            } else if self.started_at_ms.is_none() {
                self.started_at_ms = Some(now_ms);
            }
        } else {
            if self.in_progress {
                debug!("Seek finished");
            }
            self.started_at_ms = None;
            clear_request = pending_request.is_some();
        }

        self.in_progress = seeking;

        SeekUpdate {
            in_progress: seeking,
            ui_busy: self.ui_busy(now_ms),
            clear_request,
        }
    }

    fn ui_busy(&self, now_ms: i64) -> bool {
        match (self.in_progress, self.started_at_ms) {
            (true, Some(started)) => now_ms - started >= self.ui_busy_threshold_ms,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive a seek lasting `duration_ms`, sampled every `step_ms`
    fn run_seek(duration_ms: i64, step_ms: i64) -> Vec<(i64, bool)> {
        let mut tracker = SeekTracker::new(250);
        let mut samples = Vec::new();
        let mut t = 0;
        while t < duration_ms {
            let update = tracker.observe(true, t, None);
            samples.push((t, update.ui_busy));
            t += step_ms;
        }
        let update = tracker.observe(false, t, None);
        samples.push((t, update.ui_busy));
        samples
    }

    #[test]
    fn test_fast_seek_never_busy() {
        let samples = run_seek(100, 10);
        assert!(samples.iter().all(|(_, busy)| !busy));
    }

    #[test]
    fn test_slow_seek_busy_after_threshold() {
        let samples = run_seek(400, 10);
        for (t, busy) in &samples[..samples.len() - 1] {
            assert_eq!(*busy, *t >= 250, "at {}ms", t);
        }
        // Drops as soon as the seek ends
        assert!(!samples.last().unwrap().1);
    }

    #[test]
    fn test_explicit_request_backdates_start() {
        let mut tracker = SeekTracker::new(250);
        let update = tracker.observe(true, 1000, Some(700));

        assert!(update.clear_request);
        assert_eq!(tracker.started_at_ms(), Some(700));
        // Requested 300ms ago, so already past the threshold
        assert!(update.ui_busy);
    }

    #[test]
    fn test_request_ignored_mid_seek() {
        let mut tracker = SeekTracker::new(250);
        tracker.observe(true, 1000, None);
        let update = tracker.observe(true, 1100, Some(500));

        assert!(!update.clear_request);
        assert_eq!(tracker.started_at_ms(), Some(1000));
    }

    #[test]
    fn test_idle_cycles_clear_stale_request() {
        let mut tracker = SeekTracker::new(250);
        let update = tracker.observe(false, 50, Some(40));
        assert!(update.clear_request);
        assert!(!update.in_progress);
        assert_eq!(tracker.started_at_ms(), None);

        let update = tracker.observe(false, 60, None);
        assert!(!update.clear_request);
    }

    #[test]
    fn test_started_at_only_while_seeking() {
        let mut tracker = SeekTracker::new(250);
        assert_eq!(tracker.started_at_ms(), None);
        tracker.observe(true, 10, None);
        assert_eq!(tracker.started_at_ms(), Some(10));
        tracker.observe(false, 20, None);
        assert_eq!(tracker.started_at_ms(), None);
        assert!(!tracker.in_progress());
    }
}
