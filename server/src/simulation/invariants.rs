//! Invariant checking for deterministic simulation testing.
//!
//! The checker is fed every observation the simulator makes and records a
//! violation whenever the store's guarantees are broken:
//!
//! - **Read monotonicity**: once a node has observed a key at write
//!   timestamp `t`, it never again observes that key at a timestamp below
//!   `t`. Visibility only grows with time, so this holds under every
//!   staleness policy as long as the clock is monotonic.
//! - **Own-read freshness** (only when own reads have zero delay): a node
//!   that committed a write at `t` reads that key at a timestamp of at
//!   least `t`, or finds a newer visible tombstone.
//! - **Duplicate rejection**: a write that fails leaves the key's history
//!   exactly as it was; a write that commits appends exactly one version.

use std::collections::HashMap;

use crate::types::{NodeId, Outcome, RequestError, Version};

/// A violated invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violation.
    pub description: String,
    /// Operation index where it was detected.
    pub operation_index: usize,
    /// Additional context.
    pub context: String,
}

type ObservationKey = (NodeId, String, String);

/// Tracks what each node has observed and checks every new observation.
#[derive(Debug, Default)]
pub struct InvariantChecker {
    check_own_reads: bool,
    /// Highest write timestamp each node has observed per key.
    observed: HashMap<ObservationKey, u64>,
    /// Latest write timestamp each node has committed per key.
    own_writes: HashMap<ObservationKey, u64>,
    violations: Vec<InvariantViolation>,
}

impl InvariantChecker {
    /// `check_own_reads` enables the own-read freshness check; only set it
    /// when writers observe their own writes with zero delay.
    #[must_use]
    pub fn new(check_own_reads: bool) -> Self {
        Self {
            check_own_reads,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn violations(&self) -> &[InvariantViolation] {
        &self.violations
    }

    #[must_use]
    pub const fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Check a write against the key's history before and after it.
    pub fn check_write(
        &mut self,
        operation_index: usize,
        table: &str,
        outcome: &Outcome,
        before: &[Version],
        after: &[Version],
    ) {
        match outcome {
            Outcome::Committed { timestamp, writer } => {
                if after.len() != before.len() + 1 {
                    self.violate(
                        operation_index,
                        "commit did not append exactly one version",
                        format!("before: {}, after: {}", before.len(), after.len()),
                    );
                }
                if let Some(version) = after.iter().find(|v| v.timestamp == *timestamp) {
                    self.own_writes.insert(
                        (*writer, table.to_string(), version.key.clone()),
                        *timestamp,
                    );
                } else {
                    self.violate(
                        operation_index,
                        "committed version missing from history",
                        format!("timestamp: {timestamp}"),
                    );
                }
            }
            Outcome::Failed { failure } => {
                if before != after {
                    self.violate(
                        operation_index,
                        "rejected write altered history",
                        failure.to_string(),
                    );
                }
                let orphaned = match failure {
                    RequestError::DuplicateTimestamp { timestamp, .. }
                        if !before.iter().any(|v| v.timestamp == *timestamp) =>
                    {
                        Some(*timestamp)
                    }
                    _ => None,
                };
                if let Some(timestamp) = orphaned {
                    self.violate(
                        operation_index,
                        "duplicate timestamp reported without an existing version",
                        format!("timestamp: {timestamp}"),
                    );
                }
            }
            other => self.violate(
                operation_index,
                "write produced a non-write outcome",
                format!("{other:?}"),
            ),
        }
    }

    /// Check a point read of `key` by `node` at `at_ms`.
    ///
    /// `history` is the key's full history, used to justify a miss.
    #[allow(clippy::too_many_arguments)]
    pub fn check_read(
        &mut self,
        operation_index: usize,
        node: NodeId,
        table: &str,
        key: &str,
        at_ms: u64,
        found: Option<&Version>,
        history: &[Version],
    ) {
        let slot = (node, table.to_string(), key.to_string());
        let own_write = self
            .own_writes
            .get(&slot)
            .copied()
            .filter(|_| self.check_own_reads);
        if let Some(own) = own_write {
            let fresh = match found {
                Some(version) => version.timestamp >= own,
                None => history.iter().any(|v| {
                    v.value.is_tombstone() && v.timestamp >= own && v.is_visible(node, at_ms)
                }),
            };
            if !fresh {
                self.violate(
                    operation_index,
                    "node did not observe its own write",
                    format!(
                        "{node} {table}/{key}: own write at {own}, read {:?}",
                        found.map(|v| v.timestamp)
                    ),
                );
            }
        }
        if let Some(version) = found {
            self.observe(operation_index, node, table, version);
        }
    }

    /// Check one version returned by a scan on `node`.
    pub fn check_scanned(
        &mut self,
        operation_index: usize,
        node: NodeId,
        table: &str,
        version: &Version,
    ) {
        self.observe(operation_index, node, table, version);
    }

    fn observe(&mut self, operation_index: usize, node: NodeId, table: &str, version: &Version) {
        let slot = (node, table.to_string(), version.key.clone());
        let previous = self.observed.get(&slot).copied().unwrap_or(0);
        if version.timestamp < previous {
            self.violate(
                operation_index,
                "node observed an older version after a newer one",
                format!(
                    "{node} {table}/{}: saw {previous}, then {}",
                    version.key, version.timestamp
                ),
            );
            return;
        }
        self.observed.insert(slot, version.timestamp);
    }

    fn violate(&mut self, operation_index: usize, description: &str, context: String) {
        tracing::error!(operation_index, description, context = %context, "invariant violated");
        self.violations.push(InvariantViolation {
            description: description.to_string(),
            operation_index,
            context,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Record, VersionValue};

    fn version(key: &str, timestamp: u64, value: VersionValue) -> Version {
        Version {
            key: key.to_string(),
            value,
            timestamp,
            writer: NodeId(0),
            visibility: [(NodeId(0), 0), (NodeId(1), 500)].into(),
        }
    }

    fn record(key: &str, timestamp: u64) -> Version {
        version(key, timestamp, VersionValue::Record(Record::new().with("f", "v")))
    }

    #[test]
    fn test_monotonic_reads_pass() {
        let mut checker = InvariantChecker::new(false);
        checker.check_read(0, NodeId(1), "t", "k", 0, Some(&record("k", 10)), &[]);
        checker.check_read(1, NodeId(1), "t", "k", 0, Some(&record("k", 10)), &[]);
        checker.check_read(2, NodeId(1), "t", "k", 0, Some(&record("k", 20)), &[]);
        assert!(!checker.has_violations());
    }

    #[test]
    fn test_regressing_read_detected() {
        let mut checker = InvariantChecker::new(false);
        checker.check_read(0, NodeId(1), "t", "k", 0, Some(&record("k", 20)), &[]);
        checker.check_scanned(1, NodeId(1), "t", &record("k", 10));
        assert_eq!(checker.violations().len(), 1);
        assert_eq!(checker.violations()[0].operation_index, 1);
    }

    #[test]
    fn test_nodes_tracked_separately() {
        let mut checker = InvariantChecker::new(false);
        checker.check_read(0, NodeId(0), "t", "k", 0, Some(&record("k", 20)), &[]);
        checker.check_read(1, NodeId(1), "t", "k", 0, Some(&record("k", 10)), &[]);
        assert!(!checker.has_violations());
    }

    #[test]
    fn test_own_read_freshness() {
        let mut checker = InvariantChecker::new(true);
        let committed = record("k", 100);
        checker.check_write(
            0,
            "t",
            &Outcome::Committed {
                timestamp: 100,
                writer: NodeId(0),
            },
            &[],
            std::slice::from_ref(&committed),
        );
        checker.check_read(1, NodeId(0), "t", "k", 100, Some(&committed), &[committed.clone()]);
        assert!(!checker.has_violations());

        checker.check_read(2, NodeId(0), "t", "k", 100, None, &[committed]);
        assert_eq!(checker.violations().len(), 1);
    }

    #[test]
    fn test_own_read_miss_justified_by_tombstone() {
        let mut checker = InvariantChecker::new(true);
        let committed = record("k", 100);
        checker.check_write(
            0,
            "t",
            &Outcome::Committed {
                timestamp: 100,
                writer: NodeId(0),
            },
            &[],
            std::slice::from_ref(&committed),
        );
        let history = vec![committed, version("k", 150, VersionValue::Tombstone)];
        checker.check_read(1, NodeId(0), "t", "k", 150, None, &history);
        assert!(!checker.has_violations());
    }

    #[test]
    fn test_rejected_write_must_not_alter_history() {
        let mut checker = InvariantChecker::new(false);
        let before = vec![record("k", 100)];
        let failed = Outcome::Failed {
            failure: RequestError::DuplicateTimestamp {
                table: "t".to_string(),
                key: "k".to_string(),
                timestamp: 100,
            },
        };
        checker.check_write(0, "t", &failed, &before, &before);
        assert!(!checker.has_violations());

        let altered = vec![record("k", 100), record("k", 101)];
        checker.check_write(1, "t", &failed, &before, &altered);
        assert_eq!(checker.violations().len(), 1);
    }
}
