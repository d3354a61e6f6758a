//! Test that end_session closes the session without a response.

use serde_json::json;

use crate::anomaly::AnomalyModel;
use crate::client_connection::ConnectionReply;
use crate::e2e_tests::helpers::*;

#[test]
fn test_end_session() {
    let server = TestServer::new(AnomalyModel::constant(0, 0));
    let client = server.connect(0);

    let reply = client.send_raw(&json!({ "type": "end_session" }).to_string());
    assert_eq!(reply, ConnectionReply::EndSession);
}

#[test]
fn test_end_session_with_tag() {
    let server = TestServer::new(AnomalyModel::constant(0, 0));
    let client = server.connect(0);

    let reply = client.send_raw(r#"{"type":"end_session","tag":"bye"}"#);
    assert_eq!(reply, ConnectionReply::EndSession);
}
