//! Worker discovery and request delivery.
//!
//! The correlator only depends on the two traits here. [`WorkerRegistry`]
//! implements both for workers connected over the `/v1/workers` WebSocket.

mod registry;

use async_trait::async_trait;

use promfan_core::error::Result;
use promfan_core::{CorrelationId, WorkerId};

pub use registry::{WorkerConnection, WorkerRegistry};

/// Supplies the current set of eligible workers for a logical group.
#[async_trait]
pub trait WorkerDirectory: Send + Sync {
    async fn list_group(&self, group: &str) -> Result<Vec<WorkerId>>;
}

/// Delivers a snapshot request to one worker. Fire-and-forget: success only
/// means the request was handed to the transport.
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn send(&self, target: WorkerId, correlation_id: CorrelationId) -> Result<()>;
}
