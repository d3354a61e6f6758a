//! Client requests as seen by the engine.
//!
//! A [`ClientRequest`] is created by the boundary layer, never by the core.
//! It is immutable except for the two receiving-side stamps, which only the
//! query handler sets.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{FieldSet, NodeId, Record, RequestId};

/// The operation a request performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Write a full record.
    Insert { values: Record },
    /// Write a partial record, merged over the current value.
    Update { values: Record },
    /// Read one key, optionally projected to `fields`.
    Read { fields: Option<FieldSet> },
    /// Read up to `record_count` keys at or after the request key.
    Scan {
        record_count: usize,
        fields: Option<FieldSet>,
    },
    /// Write a tombstone.
    Delete,
    /// Clear the request table's history, or the whole store when the
    /// table is empty. `export` is handled by the boundary layer.
    Cleanup { export: Option<PathBuf> },
}

impl Operation {
    /// Stable operation name, used for measurements and logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Insert { .. } => "INSERT",
            Self::Update { .. } => "UPDATE",
            Self::Read { .. } => "READ",
            Self::Scan { .. } => "SCAN",
            Self::Delete => "DELETE",
            Self::Cleanup { .. } => "CLEANUP",
        }
    }

    /// Whether this operation appends to the version store.
    #[must_use]
    pub const fn is_write(&self) -> bool {
        matches!(self, Self::Insert { .. } | Self::Update { .. } | Self::Delete)
    }
}

/// A request that failed validation.
///
/// Validation always happens before any state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationError {
    /// The table name is empty.
    MissingTable,
    /// The key is empty.
    MissingKey,
    /// A mutation carries no field values.
    MissingValue,
    /// A field value has an empty column name.
    MissingColumn,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTable => write!(f, "request is missing a table"),
            Self::MissingKey => write!(f, "request is missing a key"),
            Self::MissingValue => write!(f, "mutation is missing a value"),
            Self::MissingColumn => write!(f, "value is missing a column name"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// One logical client operation.
///
/// # Invariants
///
/// - `received_at` and `received_by` are `None` until the receiving query
///   handler stamps them; callers cannot set them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRequest {
    id: RequestId,
    table: String,
    key: String,
    operation: Operation,
    received_at: Option<u64>,
    received_by: Option<NodeId>,
}

impl ClientRequest {
    /// Create a request with a freshly allocated id.
    #[must_use]
    pub fn new(table: impl Into<String>, key: impl Into<String>, operation: Operation) -> Self {
        Self::with_id(RequestId::next(), table, key, operation)
    }

    /// Create a request with an explicit id.
    #[must_use]
    pub fn with_id(
        id: RequestId,
        table: impl Into<String>,
        key: impl Into<String>,
        operation: Operation,
    ) -> Self {
        Self {
            id,
            table: table.into(),
            key: key.into(),
            operation,
            received_at: None,
            received_by: None,
        }
    }

    #[must_use]
    pub fn insert(table: impl Into<String>, key: impl Into<String>, values: Record) -> Self {
        Self::new(table, key, Operation::Insert { values })
    }

    #[must_use]
    pub fn update(table: impl Into<String>, key: impl Into<String>, values: Record) -> Self {
        Self::new(table, key, Operation::Update { values })
    }

    #[must_use]
    pub fn read(
        table: impl Into<String>,
        key: impl Into<String>,
        fields: Option<FieldSet>,
    ) -> Self {
        Self::new(table, key, Operation::Read { fields })
    }

    #[must_use]
    pub fn scan(
        table: impl Into<String>,
        start_key: impl Into<String>,
        record_count: usize,
        fields: Option<FieldSet>,
    ) -> Self {
        Self::new(
            table,
            start_key,
            Operation::Scan {
                record_count,
                fields,
            },
        )
    }

    #[must_use]
    pub fn delete(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(table, key, Operation::Delete)
    }

    /// A cleanup of `table`, or of every table when `table` is `None`.
    #[must_use]
    pub fn cleanup(table: Option<&str>, export: Option<PathBuf>) -> Self {
        Self::new(table.unwrap_or_default(), "", Operation::Cleanup { export })
    }

    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub const fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Simulated arrival time, once stamped.
    #[must_use]
    pub const fn received_at(&self) -> Option<u64> {
        self.received_at
    }

    /// The receiving node, once stamped.
    #[must_use]
    pub const fn received_by(&self) -> Option<NodeId> {
        self.received_by
    }

    /// A copy of this request for another shard, with its own record count
    /// and no receiving stamps.
    #[must_use]
    pub(crate) fn rescoped_scan(&self, record_count: usize) -> Self {
        let fields = match &self.operation {
            Operation::Scan { fields, .. } => fields.clone(),
            _ => None,
        };
        Self::with_id(
            self.id,
            self.table.clone(),
            self.key.clone(),
            Operation::Scan {
                record_count,
                fields,
            },
        )
    }

    /// Set the receiving-side stamps. Only the query handler calls this.
    pub(crate) const fn stamp(&mut self, at: u64, by: NodeId) {
        self.received_at = Some(at);
        self.received_by = Some(by);
    }

    /// Check that the request carries everything its operation needs.
    ///
    /// # Errors
    ///
    /// Returns the first missing piece, checked in the order table, key,
    /// value, column.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.operation {
            Operation::Cleanup { .. } => Ok(()),
            Operation::Scan { .. } => {
                if self.table.is_empty() {
                    return Err(ValidationError::MissingTable);
                }
                Ok(())
            }
            Operation::Read { .. } | Operation::Delete => self.validate_target(),
            Operation::Insert { values } | Operation::Update { values } => {
                self.validate_target()?;
                if values.is_empty() {
                    return Err(ValidationError::MissingValue);
                }
                if values.iter().any(|(column, _)| column.is_empty()) {
                    return Err(ValidationError::MissingColumn);
                }
                Ok(())
            }
        }
    }

    fn validate_target(&self) -> Result<(), ValidationError> {
        if self.table.is_empty() {
            return Err(ValidationError::MissingTable);
        }
        if self.key.is_empty() {
            return Err(ValidationError::MissingKey);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_is_unstamped() {
        let request = ClientRequest::read("usertable", "user1", None);
        assert_eq!(request.received_at(), None);
        assert_eq!(request.received_by(), None);
    }

    #[test]
    fn test_stamp_sets_both_fields() {
        let mut request = ClientRequest::delete("usertable", "user1");
        request.stamp(42, NodeId(3));
        assert_eq!(request.received_at(), Some(42));
        assert_eq!(request.received_by(), Some(NodeId(3)));
    }

    #[test]
    fn test_validate_insert() {
        let ok = ClientRequest::insert("t", "k", Record::new().with("f", "v"));
        assert_eq!(ok.validate(), Ok(()));

        let no_key = ClientRequest::insert("t", "", Record::new().with("f", "v"));
        assert_eq!(no_key.validate(), Err(ValidationError::MissingKey));

        let no_value = ClientRequest::insert("t", "k", Record::new());
        assert_eq!(no_value.validate(), Err(ValidationError::MissingValue));

        let no_column = ClientRequest::update("t", "k", Record::new().with("", "v"));
        assert_eq!(no_column.validate(), Err(ValidationError::MissingColumn));

        let no_table = ClientRequest::insert("", "k", Record::new().with("f", "v"));
        assert_eq!(no_table.validate(), Err(ValidationError::MissingTable));
    }

    #[test]
    fn test_validate_scan_allows_empty_start_key() {
        let scan = ClientRequest::scan("t", "", 10, None);
        assert_eq!(scan.validate(), Ok(()));
    }

    #[test]
    fn test_validate_cleanup_always_ok() {
        assert_eq!(ClientRequest::cleanup(None, None).validate(), Ok(()));
    }

    #[test]
    fn test_rescoped_scan_keeps_id_and_fields() {
        let fields: FieldSet = ["a".to_string()].into();
        let mut scan = ClientRequest::scan("t", "k", 10, Some(fields.clone()));
        scan.stamp(1, NodeId(0));
        let rescoped = scan.rescoped_scan(4);
        assert_eq!(rescoped.id(), scan.id());
        assert_eq!(rescoped.received_at(), None);
        assert_eq!(
            rescoped.operation(),
            &Operation::Scan {
                record_count: 4,
                fields: Some(fields)
            }
        );
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::Delete.name(), "DELETE");
        assert!(Operation::Delete.is_write());
        assert!(!Operation::Read { fields: None }.is_write());
    }
}
