//! Simulated time source for deterministic testing.
//!
//! This module provides a controlled time source that allows tests to
//! advance time explicitly, ensuring deterministic behavior.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::storage::time::TimeSource;

/// A simulated time source for deterministic testing.
///
/// Unlike [`SystemTimeSource`](crate::storage::time::SystemTimeSource), this
/// implementation does not use the real system clock. Instead, time only
/// advances when explicitly told to, or when a caller "sleeps", making
/// delay-based behavior fully deterministic.
///
/// # Thread Safety
///
/// The counter is an [`AtomicU64`], so one instance can be shared across
/// every query handler and test thread. A sleep advances the shared clock
/// for everyone, exactly as if the simulated time had passed.
///
/// # Example
///
/// ```
/// use lagstore::simulation::SimulatedTimeSource;
/// use lagstore::storage::time::TimeSource;
///
/// let time = SimulatedTimeSource::new(1000);
/// assert_eq!(time.now_ms(), 1000);
///
/// time.advance(100);
/// assert_eq!(time.now_ms(), 1100);
///
/// time.sleep_ms(50);
/// assert_eq!(time.now_ms(), 1150);
///
/// time.set(5000);
/// assert_eq!(time.now_ms(), 5000);
/// ```
#[derive(Debug)]
pub struct SimulatedTimeSource {
    /// Current simulated time in milliseconds since Unix epoch.
    current_time_ms: AtomicU64,
}

impl SimulatedTimeSource {
    /// Create a new simulated time source with the given initial time.
    #[must_use]
    pub const fn new(initial_time_ms: u64) -> Self {
        Self {
            current_time_ms: AtomicU64::new(initial_time_ms),
        }
    }

    /// Create a new simulated time source starting at a reasonable default time.
    ///
    /// Uses `1_700_000_000_000` (approximately November 2023) as the starting point.
    #[must_use]
    pub const fn default_start() -> Self {
        Self::new(1_700_000_000_000)
    }

    /// Advance time by the given number of milliseconds.
    ///
    /// Time saturates at `u64::MAX` if overflow would occur.
    pub fn advance(&self, ms: u64) {
        // fetch_update only fails when the closure returns None.
        let _ = self
            .current_time_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_add(ms))
            });
    }

    /// Set the current time to a specific value.
    ///
    /// Note: this can move time backwards, which breaks visibility
    /// monotonicity for readers. Prefer `advance` for normal testing.
    pub fn set(&self, time_ms: u64) {
        self.current_time_ms.store(time_ms, Ordering::SeqCst);
    }

    /// Get the current simulated time without advancing it.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.current_time_ms.load(Ordering::SeqCst)
    }
}

impl TimeSource for SimulatedTimeSource {
    fn now_ms(&self) -> u64 {
        self.current()
    }

    fn sleep_ms(&self, ms: u64) {
        self.advance(ms);
    }
}

impl Default for SimulatedTimeSource {
    fn default() -> Self {
        Self::default_start()
    }
}

impl Clone for SimulatedTimeSource {
    fn clone(&self) -> Self {
        Self::new(self.current())
    }
}
