//! Time source abstraction for deterministic simulation testing.
//!
//! This module provides a `TimeSource` trait that abstracts over "now" and
//! "sleep", allowing the engine to use the real clock in production and
//! simulated time in tests. Everything that computes or applies a delay
//! depends only on this trait, never on which implementation is active.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Abstraction over time operations.
///
/// Implementations are shared by reference across every concurrent caller,
/// so they must be `Send + Sync`.
pub trait TimeSource: Send + Sync + std::fmt::Debug {
    /// Get the current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> u64;

    /// Let `ms` milliseconds pass for the caller.
    ///
    /// The real clock blocks the calling thread; a simulated clock advances
    /// its own counter and returns immediately.
    fn sleep_ms(&self, ms: u64);
}

/// Real time source using the system clock.
///
/// This is the default implementation used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    #[allow(clippy::cast_possible_truncation)] // Milliseconds won't overflow u64 for billions of years
    fn now_ms(&self) -> u64 {
        // duration_since(UNIX_EPOCH) only fails if system time is before 1970.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    fn sleep_ms(&self, ms: u64) {
        if ms > 0 {
            std::thread::sleep(Duration::from_millis(ms));
        }
    }
}
