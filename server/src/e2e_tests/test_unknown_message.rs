//! Test that undecodable frames produce an error response, not a crash.

use serde_json::json;

use crate::anomaly::AnomalyModel;
use crate::e2e_tests::helpers::*;

#[test]
fn test_unknown_type() {
    let server = TestServer::new(AnomalyModel::constant(0, 0));
    let client = server.connect(0);

    let resp = client.send(&json!({ "type": "upsert", "table": TABLE, "key": "k" }));
    assert_eq!(status(&resp), "failed");
    assert_eq!(error_kind(&resp), "unknown_message_type");
    assert_eq!(wait_timeout(&resp), 0);
}

#[test]
fn test_not_json() {
    let server = TestServer::new(AnomalyModel::constant(0, 0));
    let client = server.connect(0);

    let crate::client_connection::ConnectionReply::Respond(response) = client.send_raw("{not json")
    else {
        panic!("expected a response");
    };
    assert!(matches!(
        response.response.failure_reason(),
        Some(crate::types::RequestError::UnknownMessageType { .. })
    ));
}

#[test]
fn test_session_survives_bad_frame() {
    let server = TestServer::new(AnomalyModel::constant(0, 0));
    let client = server.connect(0);

    client.send(&json!({ "type": 42 }));
    let resp = client.send(&insert("user1", &json!({ "f": "v" })));
    assert_eq!(status(&resp), "committed");
}
