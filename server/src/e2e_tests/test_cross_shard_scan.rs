//! Test scans that span several range shards.

use std::sync::Arc;

use serde_json::json;

use crate::anomaly::{AnomalyModel, ConstantClientDelay};
use crate::e2e_tests::helpers::*;
use crate::sharding::RangeSharding;

/// Shards: [..A) [A..D) [D..Udo) [Udo..]
fn range_server(model: AnomalyModel) -> TestServer {
    let sharding = RangeSharding::new(
        vec!["A".to_string(), "D".to_string(), "Udo".to_string()],
        true,
        4,
    )
    .unwrap();
    TestServer::sharded(model, Arc::new(sharding), 1)
}

fn populate(client: &TestClient) {
    for key in ["Alice", "Bob", "Carl", "Dora", "Eve", "Zed"] {
        let resp = client.send(&insert(key, &json!({ "name": key })));
        assert_eq!(status(&resp), "committed", "{key}");
    }
}

#[test]
fn test_keys_land_on_their_range_shard() {
    let server = range_server(AnomalyModel::constant(0, 0));
    populate(&server.connect(0));

    let counts: Vec<usize> = server
        .cluster
        .shards()
        .iter()
        .map(|shard| shard.store().key_count(TABLE))
        .collect();
    assert_eq!(counts, vec![0, 3, 2, 1]);
}

#[test]
fn test_scan_continues_into_following_shards() {
    let server = range_server(AnomalyModel::constant(0, 0));
    let client = server.connect(0);
    populate(&client);

    let resp = client.send(&scan("Bob", 4));
    assert_eq!(status(&resp), "scanned");
    assert_eq!(scanned_keys(&resp), vec!["Bob", "Carl", "Dora", "Eve"]);
}

#[test]
fn test_scan_stops_when_count_met() {
    let server = range_server(AnomalyModel::constant(0, 0));
    let client = server.connect(0);
    populate(&client);

    let resp = client.send(&scan("Alice", 2));
    assert_eq!(scanned_keys(&resp), vec!["Alice", "Bob"]);
}

#[test]
fn test_scan_runs_out_of_shards() {
    let server = range_server(AnomalyModel::constant(0, 0));
    let client = server.connect(0);
    populate(&client);

    let resp = client.send(&scan("Dora", 100));
    assert_eq!(scanned_keys(&resp), vec!["Dora", "Eve", "Zed"]);
}

#[test]
fn test_scan_projection_and_wait() {
    let server = range_server(
        AnomalyModel::constant(0, 0).with_client_delay(Box::new(ConstantClientDelay::new(15))),
    );
    let client = server.connect(0);
    populate(&client);

    let resp = client.send(&json!({
        "type": "scan", "table": TABLE, "start_key": "C", "record_count": 2, "fields": ["name"]
    }));
    assert_eq!(scanned_keys(&resp), vec!["Carl", "Dora"]);
    assert_eq!(resp["outcome"]["versions"][1]["value"]["fields"]["name"], "Dora");
    assert_eq!(wait_timeout(&resp), 15);
}
