//! Test that missing required fields are rejected before any state change.

use serde_json::json;

use crate::anomaly::{AnomalyModel, ConstantClientDelay};
use crate::e2e_tests::helpers::*;

fn server() -> TestServer {
    TestServer::new(
        AnomalyModel::constant(0, 0).with_client_delay(Box::new(ConstantClientDelay::new(40))),
    )
}

fn reason(response: &serde_json::Value) -> &str {
    response["outcome"]["failure"]["reason"]
        .as_str()
        .unwrap_or_default()
}

#[test]
fn test_missing_key() {
    let server = server();
    let client = server.connect(0);

    let resp = client.send(&json!({ "type": "insert", "table": TABLE, "values": { "f": "v" } }));
    assert_eq!(error_kind(&resp), "validation");
    assert_eq!(reason(&resp), "missing_key");
    assert_eq!(wait_timeout(&resp), 0);
    assert_eq!(server.cluster.shards()[0].store().key_count(TABLE), 0);
}

#[test]
fn test_missing_table() {
    let server = server();
    let client = server.connect(0);

    let resp = client.send(&json!({ "type": "read", "key": "user1" }));
    assert_eq!(reason(&resp), "missing_table");

    let resp = client.send(&json!({ "type": "scan", "start_key": "user1", "record_count": 3 }));
    assert_eq!(reason(&resp), "missing_table");
}

#[test]
fn test_missing_value() {
    let server = server();
    let client = server.connect(0);

    let resp = client.send(&json!({ "type": "update", "table": TABLE, "key": "user1" }));
    assert_eq!(reason(&resp), "missing_value");

    let resp = client.send(&insert("user1", &json!({})));
    assert_eq!(reason(&resp), "missing_value");
}

#[test]
fn test_missing_column() {
    let server = server();
    let client = server.connect(0);

    let resp = client.send(&insert("user1", &json!({ "": "orphan" })));
    assert_eq!(reason(&resp), "missing_column");
    assert_eq!(server.cluster.shards()[0].store().key_count(TABLE), 0);
}

#[test]
fn test_valid_request_gets_client_delay() {
    let server = server();
    let client = server.connect(0);

    let resp = client.send(&insert("user1", &json!({ "f": "v" })));
    assert_eq!(wait_timeout(&resp), 40);
}
