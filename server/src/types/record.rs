//! Record payloads carried by writes and returned by reads.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A set of field names used to project a read.
///
/// An empty set means "all fields".
pub type FieldSet = BTreeSet<String>;

/// A record: an ordered mapping from field (column) name to value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, String>,
}

impl Record {
    /// Create an empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    /// Set a field, returning the record for chaining.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Insert or replace a field.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over `(field, value)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Return a copy containing only the requested fields.
    ///
    /// `None` or an empty set returns every field. Requested fields that
    /// the record does not have are silently absent from the result.
    #[must_use]
    pub fn project(&self, fields: Option<&FieldSet>) -> Self {
        match fields {
            Some(wanted) if !wanted.is_empty() => Self {
                fields: self
                    .fields
                    .iter()
                    .filter(|(name, _)| wanted.contains(name.as_str()))
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect(),
            },
            _ => self.clone(),
        }
    }

    /// Return this record with `update`'s fields written over it.
    #[must_use]
    pub fn merged_with(&self, update: &Self) -> Self {
        let mut merged = self.clone();
        for (name, value) in &update.fields {
            merged.fields.insert(name.clone(), value.clone());
        }
        merged
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
