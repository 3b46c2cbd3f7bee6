//! Time injection
//!
//! The kernel never reads a wall clock. Time exists only as a tick count that
//! some external driver pushes forward: a hardware timer interrupt, a host
//! event loop, or a test harness.

/// A sink for tick updates
///
/// Implemented by the kernel. Drivers only ever move time forward; a value
/// that is not strictly greater than the current tick is ignored, so drivers
/// may safely replay or duplicate updates.
pub trait TickDriver {
    /// Advances the clock to `seq`
    ///
    /// Returns true if the clock moved (and waiters were woken).
    fn tick_to(&self, seq: u64) -> bool;

    /// Returns the last tick value the clock accepted
    fn now_tick(&self) -> u64;

    /// Advances the clock by `delta` ticks
    ///
    /// Saturates at `u64::MAX`. A zero delta is a no-op.
    fn advance(&self, delta: u64) -> bool {
        self.tick_to(self.now_tick().saturating_add(delta))
    }
}
