//! Test administrative cleanup, with and without measurement export.

use serde_json::json;

use crate::anomaly::AnomalyModel;
use crate::e2e_tests::helpers::*;

#[test]
fn test_cleanup_table() {
    let server = TestServer::new(AnomalyModel::constant(0, 0));
    let client = server.connect(0);

    client.send(&insert("user1", &json!({ "f": "v" })));
    client.send(&json!({ "type": "insert", "table": "other", "key": "k", "values": { "f": "v" } }));

    let resp = client.send(&json!({ "type": "cleanup", "table": TABLE }));
    assert_eq!(status(&resp), "ok");

    assert_eq!(status(&client.send(&read("user1"))), "not_found");
    let resp = client.send(&json!({ "type": "read", "table": "other", "key": "k" }));
    assert_eq!(status(&resp), "found");
}

#[test]
fn test_cleanup_everything() {
    let server = TestServer::new(AnomalyModel::constant(0, 0));
    let client = server.connect(0);

    client.send(&insert("user1", &json!({ "f": "v" })));
    client.send(&json!({ "type": "insert", "table": "other", "key": "k", "values": { "f": "v" } }));

    assert_eq!(status(&client.send(&json!({ "type": "cleanup" }))), "ok");
    assert_eq!(server.cluster.shards()[0].store().key_count(TABLE), 0);
    assert_eq!(server.cluster.shards()[0].store().key_count("other"), 0);
}

#[test]
fn test_cleanup_exports_then_resets_measurements() {
    let server = TestServer::new(AnomalyModel::constant(0, 0));
    let client = server.connect(0);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("measurements.json");

    client.send(&insert("user1", &json!({ "f": "v" })));
    client.send(&read("user1"));
    client.send(&read("user2"));

    let resp = client.send(&json!({ "type": "cleanup", "export": path }));
    assert_eq!(status(&resp), "ok");

    let exported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(exported["INSERT"]["count"], 1);
    assert_eq!(exported["READ"]["count"], 2);
    assert!(server.cluster.measurements().snapshot().is_empty());
}

#[test]
fn test_export_failure_leaves_data() {
    let server = TestServer::new(AnomalyModel::constant(0, 0));
    let client = server.connect(0);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("measurements.json");

    client.send(&insert("user1", &json!({ "f": "v" })));
    let resp = client.send(&json!({ "type": "cleanup", "export": path }));
    assert_eq!(error_kind(&resp), "internal");
    assert_eq!(status(&client.send(&read("user1"))), "found");
}

#[cfg(target_os = "linux")]
#[test]
fn test_export_write_failure_leaves_data() {
    let server = TestServer::new(AnomalyModel::constant(0, 0));
    let client = server.connect(0);

    client.send(&insert("user1", &json!({ "f": "v" })));
    let resp = client.send(&json!({ "type": "cleanup", "export": "/dev/full" }));
    assert_eq!(error_kind(&resp), "internal");
    assert_eq!(status(&client.send(&read("user1"))), "found");
    assert_eq!(
        server.cluster.measurements().get("INSERT").map(|s| s.count),
        Some(1)
    );
}
