use std::sync::Arc;

use crate::anomaly::AnomalyModel;
use crate::cluster::Cluster;
use crate::simulation::SimulatedTimeSource;
use crate::sharding::ShardingStrategy;

/// Start time of every test clock.
pub const TEST_START_MS: u64 = 1_000_000;

/// Build a cluster on a fresh virtual clock.
///
/// Returns the clock alongside the cluster so tests can advance it.
pub fn virtual_cluster(
    model: AnomalyModel,
    sharding: Arc<dyn ShardingStrategy>,
    replicas: usize,
) -> (Arc<SimulatedTimeSource>, Cluster) {
    let time = Arc::new(SimulatedTimeSource::new(TEST_START_MS));
    let cluster = Cluster::builder(time.clone())
        .replicas(replicas)
        .sharding(sharding)
        .model(model)
        .build();
    (time, cluster)
}
