//! Append-only version history of a single key.

use std::sync::Arc;

use crate::types::{NodeId, Version};

/// The ordered sequence of versions of one `(table, key)`.
///
/// # Invariants
///
/// - Versions are sorted by strictly increasing `timestamp`.
/// - Versions are never removed or edited; only the owning table's cleanup
///   drops a history as a whole.
#[derive(Debug, Default)]
pub struct KeyHistory {
    versions: Vec<Arc<Version>>,
}

/// A version already exists at this timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampTaken(pub u64);

impl KeyHistory {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            versions: Vec::new(),
        }
    }

    /// Insert `version` at its timestamp position.
    ///
    /// Writes may arrive out of timestamp order when several callers race
    /// for the key lock, so the version is placed, not pushed.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampTaken`] and leaves the history untouched if a
    /// version with the identical timestamp exists.
    pub fn append(&mut self, version: Version) -> Result<Arc<Version>, TimestampTaken> {
        let timestamp = version.timestamp;
        match self
            .versions
            .binary_search_by_key(&timestamp, |existing| existing.timestamp)
        {
            Ok(_) => Err(TimestampTaken(timestamp)),
            Err(position) => {
                let version = Arc::new(version);
                self.versions.insert(position, Arc::clone(&version));
                Ok(version)
            }
        }
    }

    /// The latest version `node` observes at `at_ms`, tombstones included.
    #[must_use]
    pub fn latest_visible(&self, node: NodeId, at_ms: u64) -> Option<&Arc<Version>> {
        self.versions
            .iter()
            .rev()
            .find(|version| version.is_visible(node, at_ms))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Every version, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Version>> {
        self.versions.iter()
    }
}
