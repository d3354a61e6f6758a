//! Replication delay generators: how long a write takes before the server
//! acknowledges it.

use std::fmt;

use crate::config::{ConfigError, PolicyConfig};
use crate::types::{ClientRequest, NodeId};

/// Computes the server-side completion latency of a write, independent of
/// when other nodes can read it.
pub trait ReplicationDelayGenerator: Send + Sync + fmt::Debug {
    fn compute_delay(&self, nodes: &[NodeId], request: &ClientRequest) -> u64;
}

/// A fixed delay whenever at least one replica exists, zero otherwise.
///
/// Replicas are the nodes other than the receiving one. The write fans out
/// to every replica in parallel, so the delay does not scale with the
/// replica count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantReplicationDelay {
    pub default_delay: u64,
}

impl ConstantReplicationDelay {
    pub const CLASS: &'static str = "constant";

    #[must_use]
    pub const fn new(default_delay: u64) -> Self {
        Self { default_delay }
    }

    /// Build from `defaultDelay` (required).
    pub fn from_config(config: &PolicyConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.require("defaultDelay")?))
    }
}

impl ReplicationDelayGenerator for ConstantReplicationDelay {
    fn compute_delay(&self, nodes: &[NodeId], request: &ClientRequest) -> u64 {
        let receiver = request.received_by();
        if nodes.iter().any(|node| Some(*node) != receiver) {
            self.default_delay
        } else {
            0
        }
    }
}

/// Writes are acknowledged immediately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoReplicationDelay;

impl NoReplicationDelay {
    pub const CLASS: &'static str = "none";
}

impl ReplicationDelayGenerator for NoReplicationDelay {
    fn compute_delay(&self, _nodes: &[NodeId], _request: &ClientRequest) -> u64 {
        0
    }
}
