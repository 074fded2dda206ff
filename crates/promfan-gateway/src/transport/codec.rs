//! Decode-once codec for worker frames.
//!
//! - Text frames => `WorkerFrame` (snapshot replies)
//! - Binary frames are rejected; the worker protocol is text-only
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;
use promfan_core::{
    error::{PromfanError, Result},
    protocol::{MetricsReply, WorkerFrame},
};

#[derive(Debug)]
pub enum Inbound {
    Reply(MetricsReply),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

pub fn decode(msg: Message) -> Result<Inbound> {
    match msg {
        Message::Text(s) => match WorkerFrame::decode(&s)? {
            WorkerFrame::Metrics(reply) => Ok(Inbound::Reply(reply)),
        },
        Message::Binary(b) => Err(PromfanError::BadRequest(format!(
            "binary worker frames are not supported ({} bytes)",
            b.len()
        ))),
        Message::Ping(v) => Ok(Inbound::Ping(v)),
        Message::Pong(v) => Ok(Inbound::Pong(v)),
        Message::Close(_) => Ok(Inbound::Close),
    }
}
