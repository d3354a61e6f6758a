// Life of a request:
// 1. JSON frame comes in over the WebSocket
// 2. Decode the frame into an internal request (unknown shapes are rejected)
// 3. The connection's router picks the owning shard; scans walk onward
//    through later shards, cleanups go to every shard
// 4. The shard's query handler validates, stamps the receive time and node,
//    then:
//     - For writes: asks the anomaly model for the visibility map and
//       replication delay, appends a version, optionally blocks
//     - For reads: returns the newest version visible to this node now
// 5. Attach the advisory client delay and respond
//
// System components:
//  - Version store (one per shard, shared by its replicas)
//  - Anomaly model (staleness, replication delay, client delay)
//  - Router and sharding strategies
//  - Simulation harness on a virtual clock

pub mod anomaly;
pub mod client;
mod client_connection;
pub mod cluster;
pub mod config;
pub mod measurements;
pub mod query;
pub mod registry;
pub mod sharding;
pub mod simulation;
pub mod storage;
#[cfg(test)]
mod testing;
pub mod types;
pub mod wire;

#[cfg(test)]
mod e2e_tests;

pub use client::SimulatedClient;
pub use client_connection::{ClientConnection, ConnectionReply};
pub use cluster::{Cluster, ClusterBuilder};
pub use registry::PolicyRegistry;
pub use sharding::Router;
pub use storage::VersionStore;
