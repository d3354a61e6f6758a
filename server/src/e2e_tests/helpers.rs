//! Common helpers for end-to-end tests.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::anomaly::AnomalyModel;
use crate::client_connection::{ClientConnection, ConnectionReply};
use crate::cluster::Cluster;
use crate::sharding::{HashSharding, ShardingStrategy};
use crate::simulation::SimulatedTimeSource;
use crate::testing::virtual_cluster;

pub const TABLE: &str = "usertable";

/// A cluster on a virtual clock, reached through JSON frames.
pub struct TestServer {
    pub time: Arc<SimulatedTimeSource>,
    pub cluster: Cluster,
}

impl TestServer {
    /// One shard with two replicas.
    #[must_use]
    pub fn new(model: AnomalyModel) -> Self {
        Self::sharded(model, Arc::new(HashSharding::single()), 2)
    }

    #[must_use]
    pub fn sharded(
        model: AnomalyModel,
        sharding: Arc<dyn ShardingStrategy>,
        replicas: usize,
    ) -> Self {
        let (time, cluster) = virtual_cluster(model, sharding, replicas);
        Self { time, cluster }
    }

    /// A connection attached to `replica`.
    #[must_use]
    pub fn connect(&self, replica: usize) -> TestClient {
        TestClient {
            connection: ClientConnection::new(
                self.cluster.router(replica),
                Arc::clone(self.cluster.measurements()),
            ),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.time.advance(ms);
    }

    #[must_use]
    pub fn now(&self) -> u64 {
        self.time.current()
    }
}

pub struct TestClient {
    pub connection: ClientConnection,
}

impl TestClient {
    /// Send a frame and return the response as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the frame ends the session instead of producing a response.
    pub fn send(&self, message: &Value) -> Value {
        match self.send_raw(&message.to_string()) {
            ConnectionReply::Respond(response) => {
                serde_json::from_str(&response.encode()).unwrap_or(Value::Null)
            }
            ConnectionReply::EndSession => panic!("expected a response, session ended"),
        }
    }

    pub fn send_raw(&self, text: &str) -> ConnectionReply {
        self.connection.handle_message(text)
    }
}

// =============================================================================
// Message builders
// =============================================================================

#[must_use]
pub fn insert(key: &str, values: &Value) -> Value {
    json!({ "type": "insert", "table": TABLE, "key": key, "values": values })
}

#[must_use]
pub fn update(key: &str, values: &Value) -> Value {
    json!({ "type": "update", "table": TABLE, "key": key, "values": values })
}

#[must_use]
pub fn read(key: &str) -> Value {
    json!({ "type": "read", "table": TABLE, "key": key })
}

#[must_use]
pub fn scan(start_key: &str, record_count: usize) -> Value {
    json!({ "type": "scan", "table": TABLE, "start_key": start_key, "record_count": record_count })
}

#[must_use]
pub fn delete(key: &str) -> Value {
    json!({ "type": "delete", "table": TABLE, "key": key })
}

// =============================================================================
// Response accessors
// =============================================================================

/// The outcome status (`committed`, `found`, `not_found`, ...).
#[must_use]
pub fn status(response: &Value) -> &str {
    response["outcome"]["status"].as_str().unwrap_or_default()
}

/// The failure kind of a failed response (`validation`, ...).
#[must_use]
pub fn error_kind(response: &Value) -> &str {
    response["outcome"]["failure"]["error"]
        .as_str()
        .unwrap_or_default()
}

/// The fields of a found record.
#[must_use]
pub fn found_fields(response: &Value) -> &Value {
    &response["outcome"]["version"]["value"]["fields"]
}

/// Keys of a scan response, in order.
#[must_use]
pub fn scanned_keys(response: &Value) -> Vec<String> {
    response["outcome"]["versions"]
        .as_array()
        .map(|versions| {
            versions
                .iter()
                .filter_map(|v| v["key"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[must_use]
pub fn wait_timeout(response: &Value) -> u64 {
    response["wait_timeout_ms"].as_u64().unwrap_or(u64::MAX)
}
