//! Test that the same sequence of operations produces identical results.

use serde_json::{Value, json};

use crate::anomaly::AnomalyModel;
use crate::e2e_tests::helpers::*;

/// Outcomes of a fixed sequence, with the per-process ids stripped.
fn run_sequence() -> Vec<Value> {
    let server = TestServer::new(AnomalyModel::constant(0, 300));
    let a = server.connect(0);
    let b = server.connect(1);
    let mut outcomes = Vec::new();

    let mut record = |response: Value| outcomes.push(response["outcome"].clone());

    record(a.send(&insert("user1", &json!({ "f": "1" }))));
    record(b.send(&insert("user1", &json!({ "f": "2" }))));
    record(b.send(&read("user1")));
    server.advance(150);
    record(b.send(&update("user2", &json!({ "g": "x" }))));
    record(a.send(&scan("user", 5)));
    server.advance(150);
    record(a.send(&scan("user", 5)));
    record(a.send(&delete("user1")));
    record(b.send(&read("user1")));

    outcomes
}

#[test]
fn test_deterministic_sequence() {
    let run1 = run_sequence();
    let run2 = run_sequence();

    assert_eq!(run1.len(), run2.len());
    for (i, (o1, o2)) in run1.iter().zip(run2.iter()).enumerate() {
        assert_eq!(o1, o2, "outcome mismatch at {i}");
    }
}
