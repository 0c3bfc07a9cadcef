//! Time sources for delayed starts and lock timestamps
//!
//! All times are milliseconds on a monotonic timeline. The same timeline must
//! be used for the `now` passed to [`SoundManager::update`](crate::SoundManager::update).

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Monotonic time source
pub trait Clock {
    /// Current time in milliseconds from an arbitrary epoch
    fn now_ms(&self) -> f64;
}

/// Clock backed by [`Instant`], starting at zero on creation
#[derive(Debug, Clone)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// Manually driven clock for deterministic tests and simulation
///
/// Clones share the same time, so a host can keep one clone and hand
/// another to the manager.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now_ms: f64) -> Self {
        let clock = Self::new();
        clock.set(now_ms);
        clock
    }

    pub fn set(&self, now_ms: f64) {
        self.now.set(now_ms);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.now.set(self.now.get() + delta_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advance() {
        let clock = ManualClock::new();
        assert_eq!(clock.now_ms(), 0.0);
        clock.advance(16.0);
        clock.advance(16.5);
        assert_eq!(clock.now_ms(), 32.5);
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::starting_at(1000.0);
        let shared = clock.clone();
        clock.set(2500.0);
        assert_eq!(shared.now_ms(), 2500.0);
    }

    #[test]
    fn system_clock_monotonic() {
        let clock = SystemClock::new();
        let t1 = clock.now_ms();
        let t2 = clock.now_ms();
        assert!(t2 >= t1);
    }
}
