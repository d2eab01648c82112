//! # Simulation Clock
//!
//! Every time-based cache (background levels, fog readback) reads the time
//! from a [`SimClock`]. Production code uses [`SystemClock`]; tests inject a
//! [`ManualClock`] and advance it explicitly.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

/// Monotonic time source, in seconds.
pub trait SimClock {
    /// Seconds since an arbitrary fixed origin. Never decreases.
    fn now(&self) -> f64;
}

/// Wall-clock time since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SimClock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Manually advanced clock.
///
/// Clones share the same time, so a test can keep one copy and hand the
/// other to a session.
///
/// # Example
///
/// ```rust,ignore
/// let clock = ManualClock::new();
/// let mut session = MinimapSession::new(settings, Box::new(clock.clone()), painter);
/// clock.advance(0.1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    seconds: Arc<Mutex<f64>>,
}

impl ManualClock {
    /// Creates a clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward by `seconds`. Negative steps are ignored.
    pub fn advance(&self, seconds: f64) {
        if seconds > 0.0 {
            *self.seconds.lock() += seconds;
        }
    }

    /// Jumps to an absolute time. Going backwards is ignored.
    pub fn set(&self, seconds: f64) {
        let mut now = self.seconds.lock();
        if seconds > *now {
            *now = seconds;
        }
    }
}

impl SimClock for ManualClock {
    fn now(&self) -> f64 {
        *self.seconds.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();

        clock.advance(0.25);
        assert_eq!(other.now(), 0.25);

        other.set(1.0);
        assert_eq!(clock.now(), 1.0);
    }

    #[test]
    fn test_manual_clock_is_monotonic() {
        let clock = ManualClock::new();
        clock.set(2.0);
        clock.set(1.0);
        clock.advance(-5.0);
        assert_eq!(clock.now(), 2.0);
    }

    #[test]
    fn test_system_clock_starts_near_zero() {
        let clock = SystemClock::new();
        assert!(clock.now() < 1.0);
    }
}
