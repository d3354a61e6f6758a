//! Cluster topology.
//!
//! A cluster is `shards × replicas` nodes. Each shard owns one
//! [`VersionStore`]; its replicas are [`QueryHandler`]s sharing that store,
//! each answering reads from its own point of view. Node ids are assigned
//! densely: replica `r` of shard `s` is node `s * replicas + r`.
//!
//! A client is attached to one replica index and talks to that replica of
//! every shard through [`Cluster::router`], so "own" and "foreign" writes
//! are decided by which replica index a client is attached to.

use std::sync::Arc;

use crate::anomaly::AnomalyModel;
use crate::config::{ConfigError, ServerConfig};
use crate::measurements::Measurements;
use crate::query::QueryHandler;
use crate::registry::PolicyRegistry;
use crate::sharding::{HashSharding, Router, ShardingStrategy};
use crate::storage::{TimeSource, VersionStore};
use crate::types::NodeId;

/// One shard: a store and the replicas serving it.
#[derive(Debug)]
pub struct Shard {
    store: Arc<VersionStore>,
    replicas: Vec<Arc<QueryHandler>>,
}

impl Shard {
    #[must_use]
    pub const fn store(&self) -> &Arc<VersionStore> {
        &self.store
    }

    #[must_use]
    pub fn replicas(&self) -> &[Arc<QueryHandler>] {
        &self.replicas
    }
}

/// Builder for [`Cluster`].
#[derive(Debug)]
pub struct ClusterBuilder {
    replicas: usize,
    model: AnomalyModel,
    strategy: Arc<dyn ShardingStrategy>,
    time: Arc<dyn TimeSource>,
    block_on_replication: bool,
    record_latency: bool,
}

impl ClusterBuilder {
    /// Replica nodes per shard. Values below 1 are raised to 1.
    #[must_use]
    pub fn replicas(mut self, replicas: usize) -> Self {
        self.replicas = replicas.max(1);
        self
    }

    /// The sharding strategy; its shard count decides the number of shards.
    #[must_use]
    pub fn sharding(mut self, strategy: Arc<dyn ShardingStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn model(mut self, model: AnomalyModel) -> Self {
        self.model = model;
        self
    }

    #[must_use]
    pub const fn block_on_replication(mut self, block: bool) -> Self {
        self.block_on_replication = block;
        self
    }

    /// Whether handlers report latency into the cluster's [`Measurements`].
    #[must_use]
    pub const fn record_latency(mut self, record: bool) -> Self {
        self.record_latency = record;
        self
    }

    #[must_use]
    pub fn build(self) -> Cluster {
        let measurements = Arc::new(Measurements::new());
        let model = Arc::new(self.model);
        let shard_count = self.strategy.shard_count();

        let shards = (0..shard_count)
            .map(|shard| {
                let nodes: Vec<NodeId> = (0..self.replicas)
                    .map(|replica| node_id(shard, replica, self.replicas))
                    .collect();
                let store = Arc::new(VersionStore::new());
                let replicas = nodes
                    .iter()
                    .map(|&node| {
                        let mut handler = QueryHandler::new(
                            node,
                            nodes.clone(),
                            Arc::clone(&store),
                            Arc::clone(&model),
                            Arc::clone(&self.time),
                        )
                        .with_blocking(self.block_on_replication);
                        if self.record_latency {
                            let recorder: Arc<Measurements> = Arc::clone(&measurements);
                            handler = handler.with_recorder(recorder);
                        }
                        Arc::new(handler)
                    })
                    .collect();
                Shard { store, replicas }
            })
            .collect();

        tracing::info!(
            shards = shard_count,
            replicas = self.replicas,
            block_on_replication = self.block_on_replication,
            "built cluster"
        );

        Cluster {
            shards,
            replicas: self.replicas,
            strategy: self.strategy,
            measurements,
            time: self.time,
        }
    }
}

fn node_id(shard: usize, replica: usize, replicas: usize) -> NodeId {
    NodeId(u32::try_from(shard * replicas + replica).unwrap_or(u32::MAX))
}

/// Every shard and replica of a deployment.
///
/// # Invariants
///
/// - `shards.len() == strategy.shard_count()`
/// - every shard has exactly `replicas` handlers, all sharing its store
#[derive(Debug)]
pub struct Cluster {
    shards: Vec<Shard>,
    replicas: usize,
    strategy: Arc<dyn ShardingStrategy>,
    measurements: Arc<Measurements>,
    time: Arc<dyn TimeSource>,
}

impl Cluster {
    /// A single-shard, single-replica cluster on `time` with no anomalies.
    /// Adjust with the builder methods.
    #[must_use]
    pub fn builder(time: Arc<dyn TimeSource>) -> ClusterBuilder {
        ClusterBuilder {
            replicas: 1,
            model: AnomalyModel::constant(0, 0),
            strategy: Arc::new(HashSharding::single()),
            time,
            block_on_replication: true,
            record_latency: true,
        }
    }

    /// Build a cluster from server configuration, resolving every policy
    /// through `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if a policy class is unknown or its parameters are
    /// invalid, or if the sharding strategy disagrees with the shard count.
    pub fn from_config(
        config: &ServerConfig,
        registry: &PolicyRegistry,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self, ConfigError> {
        let model = registry.anomaly_model(
            &config.staleness,
            &config.replication_delay,
            &config.client_delay,
        )?;
        let strategy = registry.sharding(&config.sharding, config.shards)?;
        if strategy.shard_count() != config.shards {
            return Err(ConfigError::ShardCountMismatch {
                expected: strategy.shard_count(),
                actual: config.shards,
            });
        }
        Ok(Self::builder(time)
            .replicas(config.replicas)
            .sharding(strategy)
            .model(model)
            .block_on_replication(config.block_on_replication)
            .build())
    }

    /// A router that talks to replica `replica % replicas` of every shard.
    #[must_use]
    pub fn router(&self, replica: usize) -> Router {
        let replica = replica % self.replicas;
        Router::from_parts(
            Arc::clone(&self.strategy),
            self.shards
                .iter()
                .map(|shard| Arc::clone(&shard.replicas[replica]))
                .collect(),
        )
    }

    #[must_use]
    pub fn shards(&self) -> &[Shard] {
        &self.shards
    }

    #[must_use]
    pub const fn replica_count(&self) -> usize {
        self.replicas
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.shards.len() * self.replicas
    }

    #[must_use]
    pub const fn measurements(&self) -> &Arc<Measurements> {
        &self.measurements
    }

    #[must_use]
    pub const fn time(&self) -> &Arc<dyn TimeSource> {
        &self.time
    }
}
