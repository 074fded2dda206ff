//! Frames exchanged with worker processes.

use serde::{Deserialize, Serialize};

use crate::error::{PromfanError, Result};
use crate::metrics::Snapshot;
use crate::protocol::CorrelationId;

/// Message type the gateway sends to request a snapshot.
pub const GET_METRICS_REQ: &str = "prom:getMetricsReq";
/// Message type a worker answers with.
pub const GET_METRICS_RES: &str = "prom:getMetricsRes";

/// Payload of `prom:getMetricsReq`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsRequest {
    pub request_id: CorrelationId,
}

/// Payload of `prom:getMetricsRes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReply {
    pub request_id: CorrelationId,
    pub metrics: Snapshot,
}

/// Gateway -> worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayFrame {
    #[serde(rename = "prom:getMetricsReq")]
    GetMetrics(MetricsRequest),
}

impl GatewayFrame {
    pub fn get_metrics(request_id: CorrelationId) -> Self {
        GatewayFrame::GetMetrics(MetricsRequest { request_id })
    }

    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| PromfanError::Internal(format!("json encode failed: {e}")))
    }

    pub fn decode(s: &str) -> Result<Self> {
        serde_json::from_str(s)
            .map_err(|e| PromfanError::BadRequest(format!("invalid gateway frame: {e}")))
    }
}

/// Worker -> gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WorkerFrame {
    #[serde(rename = "prom:getMetricsRes")]
    Metrics(MetricsReply),
}

impl WorkerFrame {
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| PromfanError::Internal(format!("json encode failed: {e}")))
    }

    pub fn decode(s: &str) -> Result<Self> {
        serde_json::from_str(s)
            .map_err(|e| PromfanError::BadRequest(format!("invalid worker frame: {e}")))
    }
}
