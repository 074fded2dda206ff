//! Worker wire protocol tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use promfan_core::protocol::worker::{GET_METRICS_REQ, GET_METRICS_RES};
use promfan_core::protocol::{GatewayFrame, WorkerFrame};
use promfan_core::CorrelationId;

#[test]
fn request_frame_shape() {
    let s = GatewayFrame::get_metrics(CorrelationId(42)).encode().unwrap();
    let v: serde_json::Value = serde_json::from_str(&s).unwrap();
    assert_eq!(v["type"], GET_METRICS_REQ);
    assert_eq!(v["data"]["requestId"], 42);
    assert_eq!(GatewayFrame::decode(&s).unwrap(), GatewayFrame::get_metrics(CorrelationId(42)));
}

#[test]
fn decode_reply_frame() {
    let s = r#"{
      "type": "prom:getMetricsRes",
      "data": {
        "requestId": 7,
        "metrics": [
          {"name": "up", "help": "Up", "type": "gauge", "values": [{"value": 1, "labels": {}}], "aggregator": "sum"}
        ]
      }
    }"#;
    let WorkerFrame::Metrics(reply) = WorkerFrame::decode(s).unwrap();
    assert_eq!(reply.request_id, CorrelationId(7));
    assert_eq!(reply.metrics.families.len(), 1);
    assert_eq!(reply.metrics.families[0].name, "up");
}

#[test]
fn reply_type_tag_is_stable() {
    let s = format!(r#"{{"type": "{GET_METRICS_RES}", "data": {{"requestId": 1, "metrics": []}}}}"#);
    let WorkerFrame::Metrics(reply) = WorkerFrame::decode(&s).unwrap();
    assert!(reply.metrics.families.is_empty());
}

#[test]
fn malformed_frames_are_bad_request() {
    for bad in [
        "not json",
        r#"{"type": "prom:unknown", "data": {}}"#,
        r#"{"type": "prom:getMetricsRes", "data": {"metrics": []}}"#,
        r#"{"type": "prom:getMetricsRes", "data": {"requestId": 1, "metrics": [{"name": "x", "type": "bogus"}]}}"#,
    ] {
        let err = WorkerFrame::decode(bad).unwrap_err();
        assert_eq!(err.client_code().as_str(), "BAD_REQUEST", "input: {bad}");
    }
}
