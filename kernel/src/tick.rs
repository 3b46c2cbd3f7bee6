//! # Tick Clock
//!
//! Monotonic tick counter with cooperative wakeups.
//!
//! The clock only moves when a driver calls [`TickClock::tick_to`]. Waiters
//! sleep on a condition variable until the value passes the tick they last
//! observed. There is no timeout; bounded waiting is the caller's business.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Monotonic tick counter
#[derive(Debug, Default)]
pub struct TickClock {
    value: Mutex<u64>,
    advanced: Condvar,
}

impl TickClock {
    /// Creates a clock at tick 0
    pub fn new() -> Self {
        Self::default()
    }

    fn value(&self) -> MutexGuard<'_, u64> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the current tick
    pub fn now(&self) -> u64 {
        *self.value()
    }

    /// Moves the clock to `seq` and wakes all waiters
    ///
    /// Ignored unless `seq` is strictly greater than the current tick.
    /// Returns true if the clock moved.
    pub fn tick_to(&self, seq: u64) -> bool {
        let mut value = self.value();
        if seq <= *value {
            return false;
        }
        *value = seq;
        drop(value);

        self.advanced.notify_all();
        true
    }

    /// Blocks until the tick is strictly greater than `after`
    ///
    /// Returns the tick observed on wakeup. Returns immediately if the clock
    /// is already past `after`.
    pub fn wait(&self, after: u64) -> u64 {
        let value = self
            .advanced
            .wait_while(self.value(), |value| *value <= after)
            .unwrap_or_else(PoisonError::into_inner);
        *value
    }
}
