//! Test that two writes to one key at the same instant are not both kept.

use serde_json::json;

use crate::anomaly::AnomalyModel;
use crate::e2e_tests::helpers::*;

#[test]
fn test_second_write_at_same_timestamp_is_rejected() {
    let server = TestServer::new(AnomalyModel::constant(0, 0));
    let a = server.connect(0);
    let b = server.connect(1);

    let first = a.send(&insert("user1", &json!({ "field0": "a" })));
    assert_eq!(status(&first), "committed");

    let second = b.send(&insert("user1", &json!({ "field0": "b" })));
    assert_eq!(status(&second), "failed");
    assert_eq!(error_kind(&second), "duplicate_timestamp");
    assert_eq!(second["outcome"]["failure"]["key"], "user1");
    assert_eq!(second["outcome"]["failure"]["timestamp"], server.now());

    // The first write is intact.
    let resp = b.send(&read("user1"));
    assert_eq!(found_fields(&resp)["field0"], "a");
    let history = server.cluster.shards()[0].store().history(TABLE, "user1");
    assert_eq!(history.len(), 1);
}

#[test]
fn test_retry_after_clock_advance_succeeds() {
    let server = TestServer::new(AnomalyModel::constant(0, 0));
    let client = server.connect(0);

    client.send(&insert("user1", &json!({ "field0": "a" })));
    let resp = client.send(&update("user1", &json!({ "field0": "b" })));
    assert_eq!(error_kind(&resp), "duplicate_timestamp");

    server.advance(1);
    let resp = client.send(&update("user1", &json!({ "field0": "b" })));
    assert_eq!(status(&resp), "committed");
    assert_eq!(found_fields(&client.send(&read("user1")))["field0"], "b");
}

#[test]
fn test_same_timestamp_on_different_keys_is_fine() {
    let server = TestServer::new(AnomalyModel::constant(0, 0));
    let client = server.connect(0);

    assert_eq!(status(&client.send(&insert("user1", &json!({ "f": "v" })))), "committed");
    assert_eq!(status(&client.send(&insert("user2", &json!({ "f": "v" })))), "committed");
}
