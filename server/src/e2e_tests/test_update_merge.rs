//! Test that updates merge over the value visible to the writer.

use serde_json::json;

use crate::anomaly::AnomalyModel;
use crate::e2e_tests::helpers::*;

#[test]
fn test_update_overwrites_named_fields_only() {
    let server = TestServer::new(AnomalyModel::constant(0, 0));
    let client = server.connect(0);

    client.send(&insert("user1", &json!({ "a": "1", "b": "2" })));
    server.advance(1);
    let resp = client.send(&update("user1", &json!({ "b": "3" })));
    assert_eq!(status(&resp), "committed");

    let resp = client.send(&read("user1"));
    assert_eq!(found_fields(&resp), &json!({ "a": "1", "b": "3" }));
}

#[test]
fn test_update_missing_key_creates_record() {
    let server = TestServer::new(AnomalyModel::constant(0, 0));
    let client = server.connect(0);

    client.send(&update("user1", &json!({ "b": "3" })));
    assert_eq!(found_fields(&client.send(&read("user1"))), &json!({ "b": "3" }));
}

#[test]
fn test_update_merges_over_writers_stale_view() {
    let server = TestServer::new(AnomalyModel::constant(0, 500));
    let a = server.connect(0);
    let b = server.connect(1);

    a.send(&insert("user1", &json!({ "a": "1" })));
    server.advance(1);
    // b has not observed a's insert yet, so its update starts from nothing.
    b.send(&update("user1", &json!({ "b": "2" })));

    let resp = b.send(&read("user1"));
    assert_eq!(found_fields(&resp), &json!({ "b": "2" }));
}
