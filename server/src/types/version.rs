//! Committed versions of a key.
//!
//! A [`Version`] is created exactly once, at commit time, and never mutated
//! afterward. Corrections are new versions; deletions are tombstones.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{FieldSet, NodeId, Record};

/// Per-write mapping from node to the delay (ms) after which that node is
/// guaranteed to observe the write.
pub type VisibilityMap = BTreeMap<NodeId, u64>;

/// The payload of a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "fields", rename_all = "snake_case")]
pub enum VersionValue {
    /// A live record.
    Record(Record),
    /// A deletion marker; reads that land on it report "not found".
    Tombstone,
}

impl VersionValue {
    #[must_use]
    pub const fn is_tombstone(&self) -> bool {
        matches!(self, Self::Tombstone)
    }

    #[must_use]
    pub const fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            Self::Tombstone => None,
        }
    }
}

/// One committed write of a key.
///
/// # Invariants
///
/// - `visibility` is computed once at write time and is immutable.
/// - Within one key's history no two versions share a `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// The key this version belongs to.
    pub key: String,
    /// The value payload, or a tombstone.
    pub value: VersionValue,
    /// Simulated time (ms) at commit.
    pub timestamp: u64,
    /// The node that accepted the write.
    pub writer: NodeId,
    /// Node → delay after which that node observes this version.
    pub visibility: VisibilityMap,
}

impl Version {
    /// The earliest simulated time at which `node` observes this version.
    ///
    /// Returns `None` if the node has no entry in the visibility map; such a
    /// node never observes the version.
    #[must_use]
    pub fn visible_from(&self, node: NodeId) -> Option<u64> {
        self.visibility
            .get(&node)
            .map(|delay| self.timestamp.saturating_add(*delay))
    }

    /// Whether `node` observes this version at time `at_ms`.
    #[must_use]
    pub fn is_visible(&self, node: NodeId, at_ms: u64) -> bool {
        self.visible_from(node).is_some_and(|from| at_ms >= from)
    }

    /// A copy of this version with its record projected to `fields`.
    #[must_use]
    pub fn projected(&self, fields: Option<&FieldSet>) -> Self {
        let value = match &self.value {
            VersionValue::Record(record) => VersionValue::Record(record.project(fields)),
            VersionValue::Tombstone => VersionValue::Tombstone,
        };
        Self {
            key: self.key.clone(),
            value,
            timestamp: self.timestamp,
            writer: self.writer,
            visibility: self.visibility.clone(),
        }
    }
}
