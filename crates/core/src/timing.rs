use rand::Rng;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// Time source and timing gate for the logic thread.
///
/// `wait` is the only way logic code blocks: physical-action timing (press
/// length, settle time after a skill) is spent here, on the single thread
/// that owns the hardware stream.
pub trait Clock: Send + Sync {
    /// Seconds since the clock was created.
    fn now(&self) -> f64;
    /// Block for `secs` seconds.
    fn wait(&self, secs: f64);
}

/// Wall clock backed by `Instant`.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn wait(&self, secs: f64) {
        if secs > 0.0 {
            thread::sleep(Duration::from_secs_f64(secs));
        }
    }
}

/// Virtual clock: `wait` advances time instantly. Used by the simulator and tests.
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, secs: f64) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += secs.max(0.0);
    }

    pub fn set(&self, secs: f64) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = secs;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn wait(&self, secs: f64) {
        self.advance(secs);
    }
}

/// Uniform sample in `[lo, hi)`. Returns `lo` for an empty range.
pub fn uniform(lo: f64, hi: f64) -> f64 {
    if hi <= lo {
        return lo;
    }
    rand::thread_rng().gen_range(lo..hi)
}

/// Gaussian sample (Box-Muller).
pub fn gauss(mean: f64, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return mean;
    }
    let mut rng = rand::thread_rng();
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + z * std_dev
}

/// Human-looking delay around `base`: gaussian with 20% deviation, never under 100ms.
pub fn human_delay(base: f64) -> f64 {
    gauss(base, base * 0.2).max(0.1)
}

/// Humanised press length: gaussian with 15% deviation, never under 40ms.
pub fn press_duration(base: f64) -> f64 {
    gauss(base, base * 0.15).max(0.04)
}

/// Integer positional offset in `[-amount, amount]`.
pub fn jitter(amount: i32) -> i32 {
    if amount <= 0 {
        return 0;
    }
    rand::thread_rng().gen_range(-amount..=amount)
}

/// True with probability `p`.
pub fn chance(p: f64) -> bool {
    rand::thread_rng().gen_bool(p.clamp(0.0, 1.0))
}

/// Sample from an inclusive `(lo, hi)` pair as stored in tuning.
pub fn between(range: (f64, f64)) -> f64 {
    uniform(range.0, range.1)
}
