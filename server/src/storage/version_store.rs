//! The versioned per-key store of one shard.
//!
//! # Concurrency
//!
//! Tables live behind a `RwLock`ed map, keys behind a `RwLock`ed
//! `BTreeMap` per table, and every key's history behind its own `Mutex`.
//! The map locks are held only long enough to find or create a history
//! handle; the duplicate-timestamp check and the append then run under the
//! key's mutex alone, so commits to one key are linearizable while
//! unrelated keys proceed independently.
//!
//! # Invariants
//!
//! - A failed commit leaves the store exactly as it was.
//! - History is only dropped by [`VersionStore::cleanup`].

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::storage::history::{KeyHistory, TimestampTaken};
use crate::types::{
    FieldSet, NodeId, Record, RequestError, ValidationError, Version, VersionValue, VisibilityMap,
};

/// Errors returned by store mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The write was rejected before any state change.
    Validation(ValidationError),
    /// The key already has a version at this exact timestamp.
    DuplicateTimestamp {
        table: String,
        key: String,
        timestamp: u64,
    },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "validation error: {e}"),
            Self::DuplicateTimestamp {
                table,
                key,
                timestamp,
            } => write!(
                f,
                "key '{key}' in table '{table}' already has a version at {timestamp}"
            ),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(e) => Some(e),
            Self::DuplicateTimestamp { .. } => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<StoreError> for RequestError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(reason) => Self::Validation { reason },
            StoreError::DuplicateTimestamp {
                table,
                key,
                timestamp,
            } => Self::DuplicateTimestamp {
                table,
                key,
                timestamp,
            },
        }
    }
}

type HistoryHandle = Arc<Mutex<KeyHistory>>;

/// The keys of one table.
#[derive(Debug, Default)]
struct Table {
    keys: RwLock<BTreeMap<String, HistoryHandle>>,
}

impl Table {
    fn history(&self, key: &str) -> Option<HistoryHandle> {
        read_lock(&self.keys).get(key).map(Arc::clone)
    }

    fn history_or_insert(&self, key: &str) -> HistoryHandle {
        if let Some(history) = self.history(key) {
            return history;
        }
        let mut keys = write_lock(&self.keys);
        Arc::clone(keys.entry(key.to_string()).or_default())
    }

    /// The first key at or after `bound`, with its history handle.
    fn next_key(&self, bound: Bound<&str>) -> Option<(String, HistoryHandle)> {
        read_lock(&self.keys)
            .range::<str, _>((bound, Bound::Unbounded))
            .next()
            .map(|(key, history)| (key.clone(), Arc::clone(history)))
    }
}

/// Per-key, node-aware history of writes for one shard.
#[derive(Debug, Default)]
pub struct VersionStore {
    tables: RwLock<HashMap<String, Arc<Table>>>,
}

impl VersionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record version.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Validation`] if the table, key or value is empty,
    ///   checked before anything is touched.
    /// - [`StoreError::DuplicateTimestamp`] if the key already has a
    ///   version at `timestamp`.
    pub fn commit(
        &self,
        table: &str,
        key: &str,
        value: Record,
        writer: NodeId,
        timestamp: u64,
        visibility: VisibilityMap,
    ) -> Result<Version, StoreError> {
        validate_write(table, key, Some(&value))?;
        self.append(table, key, writer, timestamp, visibility, |_| {
            VersionValue::Record(value)
        })
    }

    /// Append a version holding `update` merged over the latest value the
    /// writer observes at `timestamp`.
    ///
    /// The merge base is read under the same key lock as the append. With
    /// no visible base (or a tombstone), `update` is committed as is.
    ///
    /// # Errors
    ///
    /// Same as [`VersionStore::commit`].
    pub fn commit_update(
        &self,
        table: &str,
        key: &str,
        update: Record,
        writer: NodeId,
        timestamp: u64,
        visibility: VisibilityMap,
    ) -> Result<Version, StoreError> {
        validate_write(table, key, Some(&update))?;
        self.append(table, key, writer, timestamp, visibility, |history| {
            let merged = history
                .latest_visible(writer, timestamp)
                .and_then(|base| base.value.as_record())
                .map_or_else(|| update.clone(), |base| base.merged_with(&update));
            VersionValue::Record(merged)
        })
    }

    /// Append a tombstone.
    ///
    /// # Errors
    ///
    /// Same as [`VersionStore::commit`], minus the value check.
    pub fn delete(
        &self,
        table: &str,
        key: &str,
        writer: NodeId,
        timestamp: u64,
        visibility: VisibilityMap,
    ) -> Result<Version, StoreError> {
        validate_write(table, key, None)?;
        self.append(table, key, writer, timestamp, visibility, |_| {
            VersionValue::Tombstone
        })
    }

    fn append(
        &self,
        table: &str,
        key: &str,
        writer: NodeId,
        timestamp: u64,
        visibility: VisibilityMap,
        value: impl FnOnce(&KeyHistory) -> VersionValue,
    ) -> Result<Version, StoreError> {
        let handle = self.table_or_insert(table).history_or_insert(key);
        let mut history = lock(&handle);
        let version = Version {
            key: key.to_string(),
            value: value(&history),
            timestamp,
            writer,
            visibility,
        };
        match history.append(version) {
            Ok(committed) => {
                tracing::debug!(
                    table,
                    key,
                    timestamp,
                    %writer,
                    versions = history.len(),
                    "committed version"
                );
                Ok(Version::clone(&committed))
            }
            Err(TimestampTaken(timestamp)) => {
                tracing::warn!(table, key, timestamp, "rejected duplicate write timestamp");
                Err(StoreError::DuplicateTimestamp {
                    table: table.to_string(),
                    key: key.to_string(),
                    timestamp,
                })
            }
        }
    }

    /// The latest version `node` observes at `at_ms`, projected to `fields`.
    ///
    /// Returns `None` if nothing is visible or the latest visible version
    /// is a tombstone.
    #[must_use]
    pub fn read_visible(
        &self,
        table: &str,
        key: &str,
        at_ms: u64,
        node: NodeId,
        fields: Option<&FieldSet>,
    ) -> Option<Version> {
        let handle = self.table(table)?.history(key)?;
        let history = lock(&handle);
        history
            .latest_visible(node, at_ms)
            .filter(|version| !version.value.is_tombstone())
            .map(|version| version.projected(fields))
    }

    /// Visible versions of keys at or after `start_key`, in key order, at
    /// most `max_records` of them.
    ///
    /// The returned iterator is lazy and one-shot: it locks one key at a
    /// time and re-derives its position from the last key it returned, so
    /// concurrent writers are never blocked for the length of a scan.
    #[must_use]
    pub fn scan_visible(
        &self,
        table: &str,
        start_key: &str,
        at_ms: u64,
        node: NodeId,
        max_records: usize,
        fields: Option<FieldSet>,
    ) -> ScanIter {
        ScanIter {
            table: self.table(table),
            cursor: Some(Bound::Included(start_key.to_string())),
            at_ms,
            node,
            remaining: max_records,
            fields,
        }
    }

    /// Drop the history of `table`, or of every table when `None`.
    ///
    /// Returns the number of keys dropped.
    pub fn cleanup(&self, table: Option<&str>) -> usize {
        let mut tables = write_lock(&self.tables);
        let dropped: Vec<Arc<Table>> = match table {
            Some(name) => tables.remove(name).into_iter().collect(),
            None => tables.drain().map(|(_, t)| t).collect(),
        };
        drop(tables);
        dropped.iter().map(|t| read_lock(&t.keys).len()).sum()
    }

    /// Every version of a key, oldest first, regardless of visibility.
    #[must_use]
    pub fn history(&self, table: &str, key: &str) -> Vec<Version> {
        self.table(table)
            .and_then(|t| t.history(key))
            .map(|handle| lock(&handle).iter().map(|v| Version::clone(v)).collect())
            .unwrap_or_default()
    }

    /// Number of keys with any history in `table`.
    #[must_use]
    pub fn key_count(&self, table: &str) -> usize {
        self.table(table).map_or(0, |t| read_lock(&t.keys).len())
    }

    fn table(&self, name: &str) -> Option<Arc<Table>> {
        read_lock(&self.tables).get(name).map(Arc::clone)
    }

    fn table_or_insert(&self, name: &str) -> Arc<Table> {
        if let Some(table) = self.table(name) {
            return table;
        }
        let mut tables = write_lock(&self.tables);
        Arc::clone(tables.entry(name.to_string()).or_default())
    }
}

/// Lazy cursor over a table returned by [`VersionStore::scan_visible`].
#[derive(Debug)]
pub struct ScanIter {
    table: Option<Arc<Table>>,
    cursor: Option<Bound<String>>,
    at_ms: u64,
    node: NodeId,
    remaining: usize,
    fields: Option<FieldSet>,
}

impl Iterator for ScanIter {
    type Item = Version;

    fn next(&mut self) -> Option<Version> {
        let table = self.table.as_ref()?;
        while self.remaining > 0 {
            let bound = self.cursor.take()?;
            let (key, handle) = table.next_key(bound.as_ref().map(String::as_str))?;
            let visible = lock(&handle)
                .latest_visible(self.node, self.at_ms)
                .filter(|version| !version.value.is_tombstone())
                .map(|version| version.projected(self.fields.as_ref()));
            self.cursor = Some(Bound::Excluded(key));
            if let Some(version) = visible {
                self.remaining -= 1;
                return Some(version);
            }
        }
        None
    }
}

fn validate_write(table: &str, key: &str, value: Option<&Record>) -> Result<(), ValidationError> {
    if table.is_empty() {
        return Err(ValidationError::MissingTable);
    }
    if key.is_empty() {
        return Err(ValidationError::MissingKey);
    }
    if let Some(value) = value {
        if value.is_empty() {
            return Err(ValidationError::MissingValue);
        }
        if value.iter().any(|(column, _)| column.is_empty()) {
            return Err(ValidationError::MissingColumn);
        }
    }
    Ok(())
}

// Every mutation under these locks is a single insert or remove, so a
// panic elsewhere cannot leave the protected data half-written.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
