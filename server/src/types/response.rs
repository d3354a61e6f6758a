//! Server responses.

use serde::{Deserialize, Serialize};

use crate::types::{NodeId, RequestId, ResponseId, ValidationError, Version};

/// A typed failure a client can match on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum RequestError {
    /// The request was rejected before any state change.
    Validation { reason: ValidationError },
    /// The key already has a version at this exact timestamp. The caller
    /// may retry; the retry receives a fresh timestamp.
    DuplicateTimestamp {
        table: String,
        key: String,
        timestamp: u64,
    },
    /// The boundary layer could not decode the message.
    UnknownMessageType { description: String },
    /// An unexpected fault, converted at the boundary.
    Internal { description: String },
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation { reason } => write!(f, "validation failed: {reason}"),
            Self::DuplicateTimestamp {
                table,
                key,
                timestamp,
            } => write!(
                f,
                "duplicate timestamp {timestamp} for key '{key}' in table '{table}'"
            ),
            Self::UnknownMessageType { description } => {
                write!(f, "unknown message type: {description}")
            }
            Self::Internal { description } => write!(f, "internal error: {description}"),
        }
    }
}

impl std::error::Error for RequestError {}

impl From<ValidationError> for RequestError {
    fn from(reason: ValidationError) -> Self {
        Self::Validation { reason }
    }
}

/// The operation-specific result of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// A mutation was committed.
    Committed { timestamp: u64, writer: NodeId },
    /// A read found a visible version.
    Found { version: Version },
    /// A read found nothing visible. A normal outcome, not an error.
    NotFound,
    /// A scan's visible versions, in key order per shard.
    Scanned { versions: Vec<Version> },
    /// An administrative operation completed.
    Ok,
    /// The request failed.
    Failed { failure: RequestError },
}

impl Outcome {
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// The response to one [`ClientRequest`](crate::types::ClientRequest).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerResponse {
    /// Unique response id.
    pub id: ResponseId,
    /// The request this answers.
    pub request_id: RequestId,
    /// What happened.
    pub outcome: Outcome,
    /// Milliseconds the issuing client should additionally wait before
    /// treating the operation as finished. Advisory; never enforced by the
    /// engine.
    pub wait_timeout_ms: u64,
}

impl ServerResponse {
    #[must_use]
    pub fn new(request_id: RequestId, outcome: Outcome, wait_timeout_ms: u64) -> Self {
        Self {
            id: ResponseId::next(),
            request_id,
            outcome,
            wait_timeout_ms,
        }
    }

    /// A failure response with no client delay.
    #[must_use]
    pub fn failure(request_id: RequestId, failure: RequestError) -> Self {
        Self::new(request_id, Outcome::Failed { failure }, 0)
    }

    /// The found version, if this is a successful read.
    #[must_use]
    pub const fn found(&self) -> Option<&Version> {
        match &self.outcome {
            Outcome::Found { version } => Some(version),
            _ => None,
        }
    }

    /// The scanned versions, if this is a successful scan.
    #[must_use]
    pub fn scanned(&self) -> Option<&[Version]> {
        match &self.outcome {
            Outcome::Scanned { versions } => Some(versions),
            _ => None,
        }
    }

    /// The failure, if the request failed.
    #[must_use]
    pub const fn failure_reason(&self) -> Option<&RequestError> {
        match &self.outcome {
            Outcome::Failed { failure } => Some(failure),
            _ => None,
        }
    }
}
