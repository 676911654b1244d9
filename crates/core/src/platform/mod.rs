pub mod stub;
pub mod hotkey;

use std::sync::Arc;

use crate::timing::Clock;
use crate::types::*;
use crate::logger;

/// Input-emulation device. Every call is fire-and-forget: failures are
/// swallowed by the implementation and nothing is retried.
pub trait Hardware: Send + Sync {
    /// Tap `key` for `duration` seconds. Does not wait for the release.
    fn press(&self, key: &str, duration: f64);
    fn hold(&self, key: &str);
    fn release(&self, key: &str);
    fn release_all(&self);
    /// Audible cue for the operator. Devices without a speaker ignore it.
    fn alert(&self, _cue: Cue) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// The player stands on the rune and the puzzle needs solving.
    RuneArrived,
    RuneSolved,
}

/// Perception source.
pub trait Vision: Send {
    fn player_position(&mut self) -> Option<Position>;
    fn detect_objects(&mut self) -> Vec<Detection>;
    fn cropped_minimap(&mut self) -> Option<Capture>;
}

impl Vision for Box<dyn Vision> {
    fn player_position(&mut self) -> Option<Position> {
        (**self).player_position()
    }

    fn detect_objects(&mut self) -> Vec<Detection> {
        (**self).detect_objects()
    }

    fn cropped_minimap(&mut self) -> Option<Capture> {
        (**self).cropped_minimap()
    }
}

/// Factory for the device pair a session runs against.
pub trait Platform: Send {
    fn hardware(&self) -> Arc<dyn Hardware>;
    fn vision(&self) -> Box<dyn Vision>;
}

/// Reuses the last detection list for `window` seconds to bound inference cost.
pub struct CachedVision<V: Vision> {
    inner: V,
    clock: Arc<dyn Clock>,
    window: f64,
    cached: Option<(f64, Vec<Detection>)>,
}

impl<V: Vision> CachedVision<V> {
    pub fn new(inner: V, clock: Arc<dyn Clock>, window: f64) -> Self {
        Self { inner, clock, window, cached: None }
    }
}

impl<V: Vision> Vision for CachedVision<V> {
    fn player_position(&mut self) -> Option<Position> {
        self.detect_objects()
            .iter()
            .find(|d| d.is_player())
            .map(|d| Position::new(d.x, d.y))
            .or_else(|| self.inner.player_position())
    }

    fn detect_objects(&mut self) -> Vec<Detection> {
        let now = self.clock.now();
        if let Some((at, detections)) = &self.cached {
            if now - at < self.window {
                return detections.clone();
            }
        }
        let fresh = self.inner.detect_objects();
        self.cached = Some((now, fresh.clone()));
        fresh
    }

    fn cropped_minimap(&mut self) -> Option<Capture> {
        self.inner.cropped_minimap()
    }
}

/// Create the platform for this build. Only the simulated stub exists;
/// device drivers live outside this crate.
pub fn create_platform(clock: Arc<dyn Clock>) -> Box<dyn Platform> {
    logger::register_prefix("stub", logger::COLOR_GRAY);
    Box::new(stub::StubPlatform::new(clock))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::ManualClock;

    struct Counting {
        calls: usize,
    }

    impl Vision for Counting {
        fn player_position(&mut self) -> Option<Position> {
            None
        }
        fn detect_objects(&mut self) -> Vec<Detection> {
            self.calls += 1;
            vec![Detection::centered("me", self.calls as i32, 0, 4, 4, 0.9)]
        }
        fn cropped_minimap(&mut self) -> Option<Capture> {
            None
        }
    }

    #[test]
    fn detections_are_cached_inside_window() {
        let clock = Arc::new(ManualClock::new(0.0));
        let mut vision = CachedVision::new(Counting { calls: 0 }, clock.clone(), 0.05);
        assert_eq!(vision.player_position(), Some(Position::new(1, 0)));
        clock.advance(0.02);
        assert_eq!(vision.detect_objects()[0].x, 1);
        clock.advance(0.04);
        assert_eq!(vision.player_position(), Some(Position::new(2, 0)));
    }
}
