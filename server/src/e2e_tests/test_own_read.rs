//! Test that a writer observes its own writes immediately.

use serde_json::json;

use crate::anomaly::AnomalyModel;
use crate::e2e_tests::helpers::*;

#[test]
fn test_read_your_writes() {
    let server = TestServer::new(AnomalyModel::constant(0, 10_000));
    let client = server.connect(0);

    let resp = client.send(&insert("user1", &json!({ "field0": "mine" })));
    assert_eq!(status(&resp), "committed");
    assert_eq!(resp["outcome"]["writer"], 0);
    assert_eq!(resp["outcome"]["timestamp"], server.now());

    let resp = client.send(&read("user1"));
    assert_eq!(status(&resp), "found");
    assert_eq!(found_fields(&resp)["field0"], "mine");
}

#[test]
fn test_own_read_delay_applies_to_writer() {
    let server = TestServer::new(AnomalyModel::constant(100, 500));
    let client = server.connect(0);

    client.send(&insert("user1", &json!({ "field0": "v" })));
    assert_eq!(status(&client.send(&read("user1"))), "not_found");
    server.advance(100);
    assert_eq!(status(&client.send(&read("user1"))), "found");
}

#[test]
fn test_read_projection() {
    let server = TestServer::new(AnomalyModel::constant(0, 0));
    let client = server.connect(0);

    client.send(&insert("user1", &json!({ "a": "1", "b": "2", "c": "3" })));
    let resp = client.send(&json!({
        "type": "read", "table": TABLE, "key": "user1", "fields": ["a", "c"]
    }));
    assert_eq!(found_fields(&resp), &json!({ "a": "1", "c": "3" }));

    let resp = client.send(&json!({
        "type": "read", "table": TABLE, "key": "user1", "fields": []
    }));
    assert_eq!(found_fields(&resp), &json!({ "a": "1", "b": "2", "c": "3" }));
}
