use rust_decimal::Decimal;
use std::fmt::Debug;
use std::sync::Mutex;

/// Source of the current time in seconds, as a decimal.
///
/// Only differences between two readings matter, so the epoch is up to the
/// implementation.
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> Decimal;
}

/// UTC wall clock with microsecond resolution
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Decimal {
        Decimal::new(chrono::Utc::now().timestamp_micros(), 6)
    }
}

/// A clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Decimal>,
}

impl ManualClock {
    pub fn new(start: Decimal) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock to an absolute time
    pub fn set(&self, now: Decimal) {
        *self.lock() = now;
    }

    /// Moves the clock forward by `seconds`
    pub fn advance(&self, seconds: Decimal) {
        *self.lock() += seconds;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Decimal> {
        // A poisoned guard still holds a valid decimal
        self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Decimal {
        *self.lock()
    }
}
