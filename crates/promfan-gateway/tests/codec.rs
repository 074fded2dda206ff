//! Worker frame decoding.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use axum::extract::ws::Message;

use promfan_core::error::PromfanError;
use promfan_core::CorrelationId;
use promfan_gateway::transport::codec::{decode, Inbound};

#[test]
fn text_reply_frame_decodes_to_reply() {
    let text = r#"{"type":"prom:getMetricsRes","data":{"requestId":42,"metrics":[
        {"name":"up","help":"up help","type":"gauge","values":[{"value":1,"labels":{}}],"aggregator":"sum"}
    ]}}"#;
    let Inbound::Reply(reply) = decode(Message::Text(text.into())).unwrap() else {
        panic!("expected a reply");
    };
    assert_eq!(reply.request_id, CorrelationId(42));
    assert!(!reply.metrics.families.is_empty());
}

#[test]
fn malformed_text_is_a_bad_request() {
    let err = decode(Message::Text("{\"type\":\"prom:somethingElse\"}".into())).unwrap_err();
    assert!(matches!(err, PromfanError::BadRequest(_)), "{err:?}");
}

#[test]
fn binary_frames_are_rejected() {
    let err = decode(Message::Binary(vec![0, 1, 2])).unwrap_err();
    assert_eq!(err, PromfanError::BadRequest("binary worker frames are not supported (3 bytes)".into()));
}

#[test]
fn control_frames_pass_through() {
    assert!(matches!(decode(Message::Ping(vec![7])).unwrap(), Inbound::Ping(p) if p == vec![7]));
    assert!(matches!(decode(Message::Pong(Vec::new())).unwrap(), Inbound::Pong(_)));
    assert!(matches!(decode(Message::Close(None)).unwrap(), Inbound::Close));
}
