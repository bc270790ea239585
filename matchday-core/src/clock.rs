//! Time source abstraction.
//!
//! The cache measures entry age against a [`Clock`] instead of calling
//! `Instant::now()` directly, so tests can move time forward without sleeping.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Source of monotonic and wall-clock time.
pub trait Clock: Send + Sync + 'static {
    /// Current monotonic instant, used for age and expiry.
    fn now(&self) -> Instant;

    /// Current wall-clock time, used for reporting when an entry was stored.
    fn wall_clock(&self) -> DateTime<Utc>;
}

/// Real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        (**self).wall_clock()
    }
}

/// Manually advanced clock for deterministic tests.
///
/// Clones share the same elapsed time, so a test can keep one handle and
/// give another to the cache.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    start_wall: DateTime<Utc>,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Creates a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            start_wall: Utc::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Creates a clock whose wall-clock time starts at `start_wall`.
    pub fn starting_at(start_wall: DateTime<Utc>) -> Self {
        Self {
            start_wall,
            ..Self::new()
        }
    }

    /// Moves time forward.
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }

    /// Moves time forward by `millis` milliseconds.
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Total time advanced since creation.
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.elapsed())
            .ok()
            .and_then(|elapsed| self.start_wall.checked_add_signed(elapsed))
            .unwrap_or(self.start_wall)
    }
}
