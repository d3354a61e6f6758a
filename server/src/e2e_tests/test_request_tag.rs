//! Test that client correlation tags are echoed and request ids are fresh.

use serde_json::json;

use crate::anomaly::AnomalyModel;
use crate::e2e_tests::helpers::*;

#[test]
fn test_tag_echoed() {
    let server = TestServer::new(AnomalyModel::constant(0, 0));
    let client = server.connect(0);

    for tag in ["1", "abc", "req-999"] {
        let mut message = read("user1");
        message["tag"] = json!(tag);
        let resp = client.send(&message);
        assert_eq!(resp["tag"], tag);
    }
}

#[test]
fn test_no_tag_omitted() {
    let server = TestServer::new(AnomalyModel::constant(0, 0));
    let client = server.connect(0);

    let resp = client.send(&read("user1"));
    assert!(resp.get("tag").is_none());
}

#[test]
fn test_request_ids_increase() {
    let server = TestServer::new(AnomalyModel::constant(0, 0));
    let client = server.connect(0);

    let first = client.send(&read("user1"))["request_id"].as_u64().unwrap();
    let second = client.send(&read("user1"))["request_id"].as_u64().unwrap();
    assert!(second > first);
}
