//! Repeat/advance policy applied when a track ends on its own

use chipdeck_common::RepeatMode;
use std::fmt;
use tracing::{debug, info};

use crate::engine::PlaybackEngine;

/// What to do about a natural end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceAction {
    /// Move to the next track; stop at the end of the playlist
    AdvanceNoWrap,
    /// Move to the next track, wrapping to the first and announcing the wrap
    AdvanceWithWrap,
    /// Leave cross-track movement alone
    Stop,
}

impl fmt::Display for AdvanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdvanceAction::AdvanceNoWrap => write!(f, "AdvanceNoWrap"),
            AdvanceAction::AdvanceWithWrap => write!(f, "AdvanceWithWrap"),
            AdvanceAction::Stop => write!(f, "Stop"),
        }
    }
}

/// Map a repeat mode to an advance action
///
/// Single-track repeat is restarted by the engine itself, so it never moves
/// between tracks here.
pub fn decide(mode: RepeatMode) -> AdvanceAction {
    match mode {
        RepeatMode::None => AdvanceAction::AdvanceNoWrap,
        RepeatMode::Playlist => AdvanceAction::AdvanceWithWrap,
        RepeatMode::Track => AdvanceAction::Stop,
    }
}

/// Result of handling a natural end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaturalEndOutcome {
    /// The engine moved to another track
    Advanced,
    /// Playlist end reached with no repeat; the engine was stopped and unloaded
    Unloaded,
    /// Nothing moved
    Held,
}

/// Apply the policy for `mode` against `engine`
pub fn resolve_natural_end(engine: &dyn PlaybackEngine, mode: RepeatMode) -> NaturalEndOutcome {
    let action = decide(mode);
    debug!("Natural end with repeat mode {} -> {}", mode, action);

    let advanced = match action {
        AdvanceAction::AdvanceNoWrap => engine.advance_track(1, false, false),
        AdvanceAction::AdvanceWithWrap => engine.advance_track(1, true, true),
        AdvanceAction::Stop => false,
    };

    if advanced {
        return NaturalEndOutcome::Advanced;
    }

    if mode == RepeatMode::None {
        info!("End of playlist reached, stopping playback");
        engine.stop_and_unload();
        NaturalEndOutcome::Unloaded
    } else {
        NaturalEndOutcome::Held
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chipdeck_common::SubtuneCursor;
    use std::sync::Mutex;

    #[derive(Default)]
    struct AdvanceProbe {
        succeed: bool,
        advances: Mutex<Vec<(i32, bool, bool)>>,
        unloads: Mutex<u32>,
    }

    impl PlaybackEngine for AdvanceProbe {
        fn is_seek_in_progress(&self) -> bool {
            false
        }
        fn duration(&self) -> f64 {
            0.0
        }
        fn position(&self) -> f64 {
            0.0
        }
        fn is_playing(&self) -> bool {
            false
        }
        fn consume_natural_end(&self) -> bool {
            false
        }
        fn track_title(&self) -> String {
            String::new()
        }
        fn track_artist(&self) -> String {
            String::new()
        }
        fn subtune_cursor(&self) -> SubtuneCursor {
            SubtuneCursor::default()
        }
        fn advance_track(&self, offset: i32, allow_wrap: bool, notify_wrap: bool) -> bool {
            self.advances
                .lock()
                .unwrap()
                .push((offset, allow_wrap, notify_wrap));
            self.succeed
        }
        fn stop_and_unload(&self) {
            *self.unloads.lock().unwrap() += 1;
        }
    }

    fn probe(succeed: bool) -> AdvanceProbe {
        AdvanceProbe {
            succeed,
            ..Default::default()
        }
    }

    #[test]
    fn test_decide() {
        assert_eq!(decide(RepeatMode::None), AdvanceAction::AdvanceNoWrap);
        assert_eq!(decide(RepeatMode::Playlist), AdvanceAction::AdvanceWithWrap);
        assert_eq!(decide(RepeatMode::Track), AdvanceAction::Stop);
    }

    #[test]
    fn test_playlist_wrap_does_not_unload() {
        let engine = probe(true);
        let outcome = resolve_natural_end(&engine, RepeatMode::Playlist);

        assert_eq!(outcome, NaturalEndOutcome::Advanced);
        assert_eq!(*engine.advances.lock().unwrap(), vec![(1, true, true)]);
        assert_eq!(*engine.unloads.lock().unwrap(), 0);
    }

    #[test]
    fn test_none_at_end_unloads_once() {
        let engine = probe(false);
        let outcome = resolve_natural_end(&engine, RepeatMode::None);

        assert_eq!(outcome, NaturalEndOutcome::Unloaded);
        assert_eq!(*engine.advances.lock().unwrap(), vec![(1, false, false)]);
        assert_eq!(*engine.unloads.lock().unwrap(), 1);
    }

    #[test]
    fn test_none_mid_playlist_advances() {
        let engine = probe(true);
        assert_eq!(
            resolve_natural_end(&engine, RepeatMode::None),
            NaturalEndOutcome::Advanced
        );
        assert_eq!(*engine.unloads.lock().unwrap(), 0);
    }

    #[test]
    fn test_failed_playlist_advance_holds() {
        let engine = probe(false);
        assert_eq!(
            resolve_natural_end(&engine, RepeatMode::Playlist),
            NaturalEndOutcome::Held
        );
        assert_eq!(*engine.unloads.lock().unwrap(), 0);
    }

    #[test]
    fn test_track_repeat_leaves_engine_alone() {
        let engine = probe(true);
        assert_eq!(
            resolve_natural_end(&engine, RepeatMode::Track),
            NaturalEndOutcome::Held
        );
        assert!(engine.advances.lock().unwrap().is_empty());
        assert_eq!(*engine.unloads.lock().unwrap(), 0);
    }
}
