//! Main simulator harness for deterministic simulation testing.
//!
//! Ties the simulation components together: a [`Cluster`] on a
//! [`SimulatedTimeSource`], one [`SimulatedClient`] per replica, a seeded
//! [`WorkloadGenerator`] and an [`InvariantChecker`] consulted after every
//! operation.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::invariants::{InvariantChecker, InvariantViolation};
use super::time::SimulatedTimeSource;
use super::workload::{WorkloadConfig, WorkloadGenerator};
use crate::anomaly::{AnomalyModel, ConstantClientDelay, ConstantReplicationDelay};
use crate::client::SimulatedClient;
use crate::cluster::Cluster;
use crate::sharding::HashSharding;
use crate::types::{ClientRequest, NodeId, Operation, Outcome, RequestError, Version};

/// Mixed into the seed for the scheduling stream, so the workload and the
/// schedule draw from independent generators.
const SCHEDULE_SEED_MIX: u64 = 0x9e37_79b9_7f4a_7c15;

/// Configuration for the simulator.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility.
    pub seed: u64,
    pub shards: usize,
    pub replicas: usize,
    pub own_reads_ms: u64,
    pub foreign_reads_ms: u64,
    pub replication_delay_ms: u64,
    pub client_delay_ms: u64,
    /// Upper bound (inclusive) of the clock advance between operations.
    /// Zero-length steps are what make duplicate timestamps possible.
    pub max_time_step_ms: u64,
    pub workload: WorkloadConfig,
}

impl SimulatorConfig {
    /// A three-replica, single-shard deployment with 500ms foreign
    /// staleness and no server or client delays.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            shards: 1,
            replicas: 3,
            own_reads_ms: 0,
            foreign_reads_ms: 500,
            replication_delay_ms: 0,
            client_delay_ms: 0,
            max_time_step_ms: 50,
            workload: WorkloadConfig::default(),
        }
    }

    #[must_use]
    pub const fn with_topology(mut self, shards: usize, replicas: usize) -> Self {
        self.shards = shards;
        self.replicas = replicas;
        self
    }

    #[must_use]
    pub const fn with_staleness(mut self, own_reads_ms: u64, foreign_reads_ms: u64) -> Self {
        self.own_reads_ms = own_reads_ms;
        self.foreign_reads_ms = foreign_reads_ms;
        self
    }

    #[must_use]
    pub const fn with_delays(mut self, replication_delay_ms: u64, client_delay_ms: u64) -> Self {
        self.replication_delay_ms = replication_delay_ms;
        self.client_delay_ms = client_delay_ms;
        self
    }

    #[must_use]
    pub const fn with_max_time_step(mut self, max_time_step_ms: u64) -> Self {
        self.max_time_step_ms = max_time_step_ms;
        self
    }

    /// Set the malformed request rate.
    #[must_use]
    pub const fn with_malformed_rate(mut self, rate: f64) -> Self {
        self.workload.malformed_rate = rate;
        self
    }
}

/// Results from a simulation run.
///
/// Contains no request ids, so two runs with the same seed compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationResult {
    pub seed: u64,
    pub operations: u64,
    pub committed: u64,
    pub duplicate_timestamps: u64,
    pub rejected: u64,
    pub found: u64,
    pub not_found: u64,
    pub scans: u64,
    pub scanned_versions: u64,
    /// Virtual clock at the end of the run.
    pub final_time_ms: u64,
    pub invariant_violations: Vec<InvariantViolation>,
}

impl SimulationResult {
    /// Whether the run saw no invariant violations.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.invariant_violations.is_empty()
    }
}

/// The main simulator harness.
#[derive(Debug)]
pub struct Simulator {
    config: SimulatorConfig,
    time: Arc<SimulatedTimeSource>,
    cluster: Cluster,
    clients: Vec<SimulatedClient>,
    workload: WorkloadGenerator,
    schedule: StdRng,
    checker: InvariantChecker,
}

impl Simulator {
    /// Build a fresh cluster for `config`.
    #[must_use]
    pub fn new(config: SimulatorConfig) -> Self {
        let time = Arc::new(SimulatedTimeSource::default_start());
        let model = AnomalyModel::constant(config.own_reads_ms, config.foreign_reads_ms)
            .with_replication(Box::new(ConstantReplicationDelay::new(
                config.replication_delay_ms,
            )))
            .with_client_delay(Box::new(ConstantClientDelay::new(config.client_delay_ms)));
        let sharding = HashSharding::new(config.shards.max(1)).unwrap_or_else(|_| HashSharding::single());
        let cluster = Cluster::builder(time.clone())
            .replicas(config.replicas)
            .sharding(Arc::new(sharding))
            .model(model)
            .build();
        let clients = (0..cluster.replica_count())
            .map(|replica| SimulatedClient::new(cluster.router(replica), time.clone()))
            .collect();

        Self {
            workload: WorkloadGenerator::with_config(config.seed, config.workload.clone()),
            schedule: StdRng::seed_from_u64(config.seed ^ SCHEDULE_SEED_MIX),
            checker: InvariantChecker::new(config.own_reads_ms == 0),
            config,
            time,
            cluster,
            clients,
        }
    }

    /// Run `operation_count` operations, checking invariants after each.
    pub fn run(&mut self, operation_count: usize) -> SimulationResult {
        let mut result = SimulationResult {
            seed: self.config.seed,
            operations: 0,
            committed: 0,
            duplicate_timestamps: 0,
            rejected: 0,
            found: 0,
            not_found: 0,
            scans: 0,
            scanned_versions: 0,
            final_time_ms: 0,
            invariant_violations: Vec::new(),
        };

        for index in 0..operation_count {
            let replica = self.schedule.random_range(0..self.clients.len());
            let request = self.workload.next_request();
            self.step(index, replica, request, &mut result);
            result.operations += 1;

            let step = self.schedule.random_range(0..=self.config.max_time_step_ms);
            self.time.advance(step);
        }

        result.final_time_ms = self.time.current();
        result.invariant_violations = self.checker.violations().to_vec();
        tracing::info!(
            seed = result.seed,
            operations = result.operations,
            committed = result.committed,
            duplicates = result.duplicate_timestamps,
            violations = result.invariant_violations.len(),
            "simulation finished"
        );
        result
    }

    fn step(
        &mut self,
        index: usize,
        replica: usize,
        request: ClientRequest,
        result: &mut SimulationResult,
    ) {
        let client = &self.clients[replica];
        let table = request.table().to_string();
        let key = request.key().to_string();
        let is_write = request.operation().is_write();
        let is_read = matches!(request.operation(), Operation::Read { .. });
        let at_ms = self.time.current();
        let node = owner_of(client, &key);
        let before = if is_write { self.history(&table, &key) } else { Vec::new() };

        let response = client.execute(request);

        match &response.outcome {
            Outcome::Committed { .. } => result.committed += 1,
            Outcome::Failed {
                failure: RequestError::DuplicateTimestamp { .. },
            } => result.duplicate_timestamps += 1,
            Outcome::Failed { .. } => result.rejected += 1,
            Outcome::Found { .. } => result.found += 1,
            Outcome::NotFound => result.not_found += 1,
            Outcome::Scanned { versions } => {
                result.scans += 1;
                result.scanned_versions += versions.len() as u64;
            }
            Outcome::Ok => {}
        }

        if response.outcome.is_failure() && !is_write {
            return;
        }
        if is_write {
            let after = self.history(&table, &key);
            self.checker
                .check_write(index, &table, &response.outcome, &before, &after);
        } else if is_read {
            let history = self.history(&table, &key);
            self.checker.check_read(
                index,
                node,
                &table,
                &key,
                at_ms,
                response.found(),
                &history,
            );
        } else if let Some(versions) = response.scanned() {
            for version in versions {
                let node = owner_of(client, &version.key);
                self.checker.check_scanned(index, node, &table, version);
            }
        }
    }

    /// Every version of `key`, from the shard owning it.
    fn history(&self, table: &str, key: &str) -> Vec<Version> {
        let shard = self.clients[0].router().shard_for(key);
        self.cluster
            .shards()
            .get(shard)
            .map(|shard| shard.store().history(table, key))
            .unwrap_or_default()
    }

    #[must_use]
    pub const fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    #[must_use]
    pub const fn checker(&self) -> &InvariantChecker {
        &self.checker
    }
}

/// The node of `client`'s replica view that owns `key`.
fn owner_of(client: &SimulatedClient, key: &str) -> NodeId {
    let router = client.router();
    router
        .shard(router.shard_for(key))
        .map_or(NodeId::default(), |handler| handler.node())
}
