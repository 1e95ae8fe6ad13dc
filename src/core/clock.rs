//! Time source for the sampling loop
//!
//! The monitor never touches `Instant` directly so tests can drive it with a
//! fake clock and check timeout and cadence behavior without sleeping.

use std::time::{Duration, Instant};

pub trait Clock {
    /// Monotonic time elapsed since the clock's origin.
    fn now(&self) -> Duration;

    fn sleep(&self, duration: Duration);
}

/// `Instant`-backed clock whose origin is its creation time
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
