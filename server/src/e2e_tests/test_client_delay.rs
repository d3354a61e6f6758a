//! Test replication blocking and the advisory client delay.

use serde_json::json;

use crate::anomaly::{AnomalyModel, ConstantClientDelay, ConstantReplicationDelay};
use crate::e2e_tests::helpers::*;

#[test]
fn test_write_blocks_for_replication_delay() {
    let server = TestServer::new(
        AnomalyModel::constant(0, 0)
            .with_replication(Box::new(ConstantReplicationDelay::new(250))),
    );
    let client = server.connect(0);
    let start = server.now();

    let resp = client.send(&insert("user1", &json!({ "f": "v" })));
    assert_eq!(resp["outcome"]["timestamp"], start);
    assert_eq!(server.now(), start + 250);

    // Reads never block.
    client.send(&read("user1"));
    assert_eq!(server.now(), start + 250);
}

#[test]
fn test_client_delay_is_advisory() {
    let server = TestServer::new(
        AnomalyModel::constant(0, 0).with_client_delay(Box::new(ConstantClientDelay::new(70))),
    );
    let client = server.connect(0);
    let start = server.now();

    let resp = client.send(&read("user1"));
    assert_eq!(wait_timeout(&resp), 70);
    assert_eq!(server.now(), start);
}

#[test]
fn test_latency_includes_replication_delay() {
    let server = TestServer::new(
        AnomalyModel::constant(0, 0)
            .with_replication(Box::new(ConstantReplicationDelay::new(40))),
    );
    let client = server.connect(0);

    client.send(&insert("user1", &json!({ "f": "v" })));
    let stats = server.cluster.measurements().get("INSERT").unwrap();
    assert_eq!(stats.max_ms, 40);
}
