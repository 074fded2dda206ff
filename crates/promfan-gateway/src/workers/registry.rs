use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};

use promfan_core::error::{PromfanError, Result};
use promfan_core::protocol::GatewayFrame;
use promfan_core::{CorrelationId, WorkerId};

use crate::config::GroupConfig;

use super::{MessageBus, WorkerDirectory};

/// One worker's outbound queue sender.
#[derive(Clone)]
pub struct WorkerConnection {
    pub tx: mpsc::Sender<Message>,
}

struct WorkerEntry {
    app: String,
    conn: WorkerConnection,
}

/// Connected workers:
/// - `worker_id -> (app, Connection)`
/// - `group -> eligible app names` (static, from config)
pub struct WorkerRegistry {
    workers: DashMap<WorkerId, WorkerEntry>,
    groups: HashMap<String, Vec<String>>,
    seq: AtomicU64,
}

impl WorkerRegistry {
    pub fn new(groups: &[GroupConfig]) -> Self {
        Self {
            workers: DashMap::new(),
            groups: groups
                .iter()
                .map(|g| (g.name.clone(), g.apps.clone()))
                .collect(),
            seq: AtomicU64::new(1),
        }
    }

    /// Register a freshly connected worker and assign its id.
    pub fn register(&self, app: &str, conn: WorkerConnection) -> WorkerId {
        let id = WorkerId(self.seq.fetch_add(1, Ordering::Relaxed));
        self.workers.insert(id, WorkerEntry { app: app.to_string(), conn });
        id
    }

    pub fn deregister(&self, id: WorkerId) -> Option<WorkerConnection> {
        self.workers.remove(&id).map(|(_, entry)| entry.conn)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

#[async_trait]
impl WorkerDirectory for WorkerRegistry {
    async fn list_group(&self, group: &str) -> Result<Vec<WorkerId>> {
        let apps = self
            .groups
            .get(group)
            .ok_or_else(|| PromfanError::Discovery(format!("unknown group: {group}")))?;
        let mut ids: Vec<WorkerId> = self
            .workers
            .iter()
            .filter(|e| apps.iter().any(|a| a == &e.value().app))
            .map(|e| *e.key())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl MessageBus for WorkerRegistry {
    async fn send(&self, target: WorkerId, correlation_id: CorrelationId) -> Result<()> {
        let conn = self
            .workers
            .get(&target)
            .map(|e| e.value().conn.clone())
            .ok_or_else(|| PromfanError::Dispatch(format!("worker {target} not connected")))?;
        let frame = GatewayFrame::get_metrics(correlation_id).encode()?;
        conn.tx.try_send(Message::Text(frame)).map_err(|e| match e {
            TrySendError::Full(_) => PromfanError::Dispatch(format!("worker {target} queue full")),
            TrySendError::Closed(_) => PromfanError::Dispatch(format!("worker {target} disconnected")),
        })
    }
}
