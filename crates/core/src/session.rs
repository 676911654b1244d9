use std::sync::Arc;

use crate::job::Jobs;
use crate::platform::Hardware;
use crate::settings::Tuning;
use crate::timing::{self, Clock};

/// Handles every component needs: devices, key bindings, time and tuning.
/// Built once at startup and cloned into each component.
#[derive(Clone)]
pub struct Session {
    pub hw: Arc<dyn Hardware>,
    pub jobs: Jobs,
    pub clock: Arc<dyn Clock>,
    pub tuning: Arc<Tuning>,
}

impl Session {
    pub fn new(hw: Arc<dyn Hardware>, jobs: Jobs, clock: Arc<dyn Clock>, tuning: Tuning) -> Self {
        Self { hw, jobs, clock, tuning: Arc::new(tuning) }
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Timing gate: block the logic thread for `secs`.
    pub fn wait(&self, secs: f64) {
        self.clock.wait(secs);
    }

    /// Wait a uniformly random time in `[lo, hi)`.
    pub fn wait_between(&self, lo: f64, hi: f64) {
        self.clock.wait(timing::uniform(lo, hi));
    }

    /// Humanised press that gates until the key is back up.
    pub fn press(&self, key: &str, duration: f64) {
        let actual = timing::press_duration(duration);
        self.hw.press(key, actual);
        self.clock.wait(actual.max(0.05));
    }
}
