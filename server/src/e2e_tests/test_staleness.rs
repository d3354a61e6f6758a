//! Test that foreign reads lag by the configured staleness.

use serde_json::json;

use crate::anomaly::AnomalyModel;
use crate::e2e_tests::helpers::*;

#[test]
fn test_foreign_read_is_stale_until_delay_elapses() {
    let server = TestServer::new(AnomalyModel::constant(0, 500));
    let writer = server.connect(0);
    let reader = server.connect(1);

    let resp = writer.send(&insert("user1", &json!({ "field0": "v1" })));
    assert_eq!(status(&resp), "committed");

    assert_eq!(status(&reader.send(&read("user1"))), "not_found");

    server.advance(499);
    assert_eq!(status(&reader.send(&read("user1"))), "not_found");

    server.advance(1);
    let resp = reader.send(&read("user1"));
    assert_eq!(status(&resp), "found");
    assert_eq!(found_fields(&resp), &json!({ "field0": "v1" }));
}

#[test]
fn test_foreign_reader_sees_previous_version_meanwhile() {
    let server = TestServer::new(AnomalyModel::constant(0, 500));
    let writer = server.connect(0);
    let reader = server.connect(1);

    writer.send(&insert("user1", &json!({ "field0": "old" })));
    server.advance(1000);
    writer.send(&insert("user1", &json!({ "field0": "new" })));

    let resp = reader.send(&read("user1"));
    assert_eq!(found_fields(&resp)["field0"], "old");

    server.advance(500);
    let resp = reader.send(&read("user1"));
    assert_eq!(found_fields(&resp)["field0"], "new");
}

#[test]
fn test_zero_staleness_is_strongly_consistent() {
    let server = TestServer::new(AnomalyModel::constant(0, 0));
    let writer = server.connect(0);
    let reader = server.connect(1);

    writer.send(&insert("user1", &json!({ "field0": "v" })));
    assert_eq!(status(&reader.send(&read("user1"))), "found");
}
