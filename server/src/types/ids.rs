//! ID types for nodes, requests and responses.
//!
//! This module provides newtype wrappers for the identifiers that flow
//! through the engine, ensuring a node id can never be confused with a
//! request id and providing convenient methods for creation and display.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Process-wide sequence for request ids.
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide sequence for response ids.
static NEXT_RESPONSE_ID: AtomicU64 = AtomicU64::new(1);

/// A logical storage/replica identity.
///
/// Nodes do not own data directly; they are referenced by the writer field
/// of a version and by its visibility map.
///
/// # Invariants
///
/// - A node id is unique within a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a node id from its raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Identifier of one logical client operation.
///
/// # Invariants
///
/// - Ids produced by [`RequestId::next`] are strictly increasing within a
///   process and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl RequestId {
    /// Allocate the next request id from the process-wide sequence.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Identifier of one server response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseId(pub u64);

impl ResponseId {
    /// Allocate the next response id from the process-wide sequence.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_RESPONSE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ResponseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resp-{}", self.0)
    }
}
