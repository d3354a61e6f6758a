//! Test deletion through tombstones.

use serde_json::json;

use crate::anomaly::AnomalyModel;
use crate::e2e_tests::helpers::*;

#[test]
fn test_delete_hides_key_from_writer() {
    let server = TestServer::new(AnomalyModel::constant(0, 500));
    let client = server.connect(0);

    client.send(&insert("user1", &json!({ "f": "v" })));
    server.advance(1);
    let resp = client.send(&delete("user1"));
    assert_eq!(status(&resp), "committed");
    assert_eq!(status(&client.send(&read("user1"))), "not_found");
}

#[test]
fn test_foreign_node_sees_deleted_value_until_stale_window_ends() {
    let server = TestServer::new(AnomalyModel::constant(0, 500));
    let writer = server.connect(0);
    let reader = server.connect(1);

    writer.send(&insert("user1", &json!({ "f": "v" })));
    server.advance(600);
    writer.send(&delete("user1"));

    assert_eq!(status(&reader.send(&read("user1"))), "found");
    server.advance(500);
    assert_eq!(status(&reader.send(&read("user1"))), "not_found");
}

#[test]
fn test_deleted_keys_skipped_by_scan() {
    let server = TestServer::new(AnomalyModel::constant(0, 0));
    let client = server.connect(0);

    for key in ["a", "b", "c"] {
        client.send(&insert(key, &json!({ "f": key })));
    }
    server.advance(1);
    client.send(&delete("b"));

    assert_eq!(scanned_keys(&client.send(&scan("a", 10))), vec!["a", "c"]);
}

#[test]
fn test_history_keeps_tombstone() {
    let server = TestServer::new(AnomalyModel::constant(0, 0));
    let client = server.connect(0);

    client.send(&insert("user1", &json!({ "f": "v" })));
    server.advance(1);
    client.send(&delete("user1"));

    let history = server.cluster.shards()[0].store().history(TABLE, "user1");
    assert_eq!(history.len(), 2);
    assert!(history[1].value.is_tombstone());
}
