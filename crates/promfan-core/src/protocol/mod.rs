//! Worker wire protocol.
//!
//! Workers and the gateway exchange adjacently tagged JSON text frames. The
//! gateway asks for a snapshot with `prom:getMetricsReq` and the worker
//! answers with `prom:getMetricsRes`, echoing the request id so the gateway
//! can route the reply back to the operation awaiting it.
//!
//! Decoding is panic-free: malformed frames are reported as
//! `PromfanError::BadRequest`.

pub mod worker;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Process-unique id minted once per scatter-gather operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(pub u64);

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a connected worker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub use worker::{GatewayFrame, MetricsReply, MetricsRequest, WorkerFrame};
