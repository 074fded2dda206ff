//! Shared error type across promfan crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed message.
    BadRequest,
    /// Worker discovery failed.
    DiscoveryFailed,
    /// Request could not be delivered to a worker.
    DispatchFailed,
    /// Not every worker replied before the deadline.
    Timeout,
    /// Worker snapshots could not be merged.
    AggregationFailed,
    /// Gateway is shutting down.
    ShuttingDown,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in responses and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::DiscoveryFailed => "DISCOVERY_FAILED",
            ClientCode::DispatchFailed => "DISPATCH_FAILED",
            ClientCode::Timeout => "TIMEOUT",
            ClientCode::AggregationFailed => "AGGREGATION_FAILED",
            ClientCode::ShuttingDown => "SHUTTING_DOWN",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PromfanError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PromfanError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("discovery failed: {0}")]
    Discovery(String),
    #[error("dispatch failed: {0}")]
    Dispatch(String),
    #[error("time out")]
    Timeout,
    #[error("aggregation failed: {0}")]
    Aggregation(String),
    #[error("shutting down")]
    Shutdown,
    #[error("internal: {0}")]
    Internal(String),
}

impl PromfanError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            PromfanError::BadRequest(_) => ClientCode::BadRequest,
            PromfanError::Discovery(_) => ClientCode::DiscoveryFailed,
            PromfanError::Dispatch(_) => ClientCode::DispatchFailed,
            PromfanError::Timeout => ClientCode::Timeout,
            PromfanError::Aggregation(_) => ClientCode::AggregationFailed,
            PromfanError::Shutdown => ClientCode::ShuttingDown,
            PromfanError::Internal(_) => ClientCode::Internal,
        }
    }
}
