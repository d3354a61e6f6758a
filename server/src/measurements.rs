//! Per-operation latency measurements.
//!
//! The engine reports one latency sample per request through
//! [`LatencyRecorder`]. [`Measurements`] aggregates them; it is constructed
//! explicitly, passed to whoever needs it, and reset with a synchronized
//! [`Measurements::reset`] between runs. [`NoopRecorder`] disables
//! collection without affecting correctness.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

/// Receives latency samples.
pub trait LatencyRecorder: Send + Sync + fmt::Debug {
    fn record(&self, operation: &str, latency_ms: u64);
}

/// Aggregated samples of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperationStats {
    pub count: u64,
    pub total_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
}

impl OperationStats {
    const fn first(latency_ms: u64) -> Self {
        Self {
            count: 1,
            total_ms: latency_ms,
            min_ms: latency_ms,
            max_ms: latency_ms,
        }
    }

    const fn add(&mut self, latency_ms: u64) {
        self.count += 1;
        self.total_ms = self.total_ms.saturating_add(latency_ms);
        if latency_ms < self.min_ms {
            self.min_ms = latency_ms;
        }
        if latency_ms > self.max_ms {
            self.max_ms = latency_ms;
        }
    }

    /// Mean latency, rounded down.
    #[must_use]
    pub const fn mean_ms(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.total_ms / self.count
        }
    }
}

/// Aggregates latency samples per operation name.
#[derive(Debug, Default)]
pub struct Measurements {
    stats: Mutex<BTreeMap<String, OperationStats>>,
}

impl Measurements {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the current aggregates.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, OperationStats> {
        self.lock().clone()
    }

    /// Aggregates for one operation.
    #[must_use]
    pub fn get(&self, operation: &str) -> Option<OperationStats> {
        self.lock().get(operation).copied()
    }

    /// Drop every sample. Concurrent `record` calls land either before or
    /// after the reset, never half way.
    pub fn reset(&self) {
        self.lock().clear();
    }

    /// Write the current aggregates as pretty JSON to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn export_json(&self, path: &Path) -> std::io::Result<()> {
        let snapshot = self.snapshot();
        let file = std::fs::File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        // Drop swallows write errors.
        writer.flush()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, OperationStats>> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LatencyRecorder for Measurements {
    fn record(&self, operation: &str, latency_ms: u64) {
        let mut stats = self.lock();
        match stats.get_mut(operation) {
            Some(entry) => entry.add(latency_ms),
            None => {
                stats.insert(operation.to_string(), OperationStats::first(latency_ms));
            }
        }
    }
}

/// Discards every sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecorder;

impl LatencyRecorder for NoopRecorder {
    fn record(&self, _operation: &str, _latency_ms: u64) {}
}
