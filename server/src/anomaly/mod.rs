//! Anomaly model.
//!
//! Three independently replaceable delay generators, combined by
//! [`AnomalyModel`]:
//!
//! - [`StalenessGenerator`]: per-node visibility delay of a write
//! - [`ReplicationDelayGenerator`]: server-side completion latency of a write
//! - [`ClientDelayGenerator`]: client-side latency of any request
//!
//! Generators own no state beyond their parameters (and, for stochastic
//! policies, a seeded RNG). A deployment can mix profiles freely, e.g. a
//! Cassandra-like staleness profile with a Mongo-like replication profile.

mod client_delay;
mod replication;
mod staleness;

pub use client_delay::{ClientDelayGenerator, ConstantClientDelay, NoClientDelay, UniformClientDelay};
pub use replication::{ConstantReplicationDelay, NoReplicationDelay, ReplicationDelayGenerator};
pub use staleness::{ConstantStaleness, StalenessGenerator, UniformStaleness};

use crate::types::{ClientRequest, NodeId, VisibilityMap};

/// The delays decided for one write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteDelays {
    /// Node → delay after which the node observes the write.
    pub visibility: VisibilityMap,
    /// How long the write takes before the server acknowledges it.
    pub replication_delay_ms: u64,
}

/// The configured combination of generators.
///
/// The query handler holds one of these and only ever calls the shared
/// contracts, never a concrete policy.
#[derive(Debug)]
pub struct AnomalyModel {
    staleness: Box<dyn StalenessGenerator>,
    replication: Box<dyn ReplicationDelayGenerator>,
    client: Box<dyn ClientDelayGenerator>,
}

impl AnomalyModel {
    #[must_use]
    pub fn new(
        staleness: Box<dyn StalenessGenerator>,
        replication: Box<dyn ReplicationDelayGenerator>,
        client: Box<dyn ClientDelayGenerator>,
    ) -> Self {
        Self {
            staleness,
            replication,
            client,
        }
    }

    /// Constant staleness, no replication delay, no client delay.
    #[must_use]
    pub fn constant(own_reads: u64, foreign_reads: u64) -> Self {
        Self::new(
            Box::new(ConstantStaleness::new(own_reads, foreign_reads)),
            Box::new(NoReplicationDelay),
            Box::new(NoClientDelay),
        )
    }

    /// Replace the replication delay generator.
    #[must_use]
    pub fn with_replication(mut self, replication: Box<dyn ReplicationDelayGenerator>) -> Self {
        self.replication = replication;
        self
    }

    /// Replace the client delay generator.
    #[must_use]
    pub fn with_client_delay(mut self, client: Box<dyn ClientDelayGenerator>) -> Self {
        self.client = client;
        self
    }

    /// Visibility map and replication delay for a stamped write.
    #[must_use]
    pub fn write_delays(&self, nodes: &[NodeId], request: &ClientRequest) -> WriteDelays {
        let visibility = self.staleness.compute_visibility_map(nodes, request);
        debug_assert!(
            nodes.iter().all(|node| visibility.contains_key(node)),
            "staleness generator must cover every node"
        );
        WriteDelays {
            visibility,
            replication_delay_ms: self.replication.compute_delay(nodes, request),
        }
    }

    /// Client-side delay for a request of any kind.
    #[must_use]
    pub fn client_delay(&self, nodes: &[NodeId], request: &ClientRequest) -> u64 {
        self.client.compute_delay(nodes, request)
    }
}
