//! Request correlator: one-to-many fan-out, many-to-one fan-in.
//!
//! Every [`Correlator::start`] mints a [`CorrelationId`], asks each target for
//! a snapshot over the [`MessageBus`], and later invokes the caller's
//! completion exactly once with one of:
//! - the merged snapshot of all replies,
//! - an empty snapshot when no targets were given,
//! - `PromfanError::Timeout` when the deadline fires first,
//! - `PromfanError::Aggregation` when the snapshots cannot be merged,
//! - `PromfanError::Shutdown` when the correlator is drained.
//!
//! The registry is a `DashMap`; both the last reply and the deadline finalize
//! an operation by removing its entry under the shard lock, so only one of
//! them ever gets hold of the completion. Callbacks and aggregation run after
//! the lock is released.
//!
//! A failed send does not lower the expected reply count: such an operation
//! can only finish through its deadline.

mod pending;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use promfan_core::error::{PromfanError, Result};
use promfan_core::metrics::{Aggregator, MergedSnapshot, Snapshot};
use promfan_core::{CorrelationId, WorkerId};

use crate::obs::metrics::GatewayMetrics;
use crate::workers::MessageBus;

pub use pending::Completion;
use pending::PendingOperation;

/// Owner of all in-flight scatter-gather operations. Cheap to clone.
#[derive(Clone)]
pub struct Correlator {
    inner: Arc<Inner>,
}

struct Inner {
    pending: DashMap<CorrelationId, PendingOperation>,
    next_id: AtomicU64,
    closed: AtomicBool,
    bus: Arc<dyn MessageBus>,
    aggregator: Arc<dyn Aggregator>,
    metrics: Arc<GatewayMetrics>,
}

impl Correlator {
    pub fn new(
        bus: Arc<dyn MessageBus>,
        aggregator: Arc<dyn Aggregator>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                pending: DashMap::new(),
                next_id: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                bus,
                aggregator,
                metrics,
            }),
        }
    }

    /// Start a scatter-gather over `targets` (deduplicated).
    ///
    /// Returns immediately; `on_complete` is invoked later from the reply or
    /// timer path, or synchronously when `targets` is empty. Must be called
    /// from within a tokio runtime.
    pub fn start<F>(
        &self,
        targets: impl IntoIterator<Item = WorkerId>,
        timeout: Duration,
        on_complete: F,
    ) -> CorrelationId
    where
        F: FnOnce(Result<MergedSnapshot>) + Send + Sync + 'static,
    {
        let id = CorrelationId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let targets: BTreeSet<WorkerId> = targets.into_iter().collect();
        let metrics = &self.inner.metrics;

        let mode = match targets.len() {
            0 => "empty",
            1 => "single",
            _ => "fanout",
        };
        metrics.operations_started.inc(&[("mode", mode)]);

        if self.inner.closed.load(Ordering::Acquire) {
            metrics.operations_completed.inc(&[("outcome", "shutdown")]);
            on_complete(Err(PromfanError::Shutdown));
            return id;
        }

        if targets.is_empty() {
            tracing::debug!(correlation_id = %id, "no eligible workers, completing with empty snapshot");
            metrics.operations_completed.inc(&[("outcome", "empty")]);
            on_complete(Ok(MergedSnapshot::empty()));
            return id;
        }

        let expected = targets.len();
        match self.inner.pending.entry(id) {
            // The shard stays locked until the entry is inserted, so the
            // deadline cannot observe the registry before the entry exists.
            Entry::Vacant(slot) => {
                let deadline = self.spawn_deadline(id, timeout);
                slot.insert(PendingOperation::new(expected, Box::new(on_complete), deadline));
            }
            Entry::Occupied(_) => {
                metrics.operations_completed.inc(&[("outcome", "internal")]);
                on_complete(Err(PromfanError::Internal(format!("correlation id {id} reused"))));
                return id;
            }
        }
        metrics.pending_operations.inc(&[]);

        // A drain that snapshotted the registry before the insert missed this entry.
        if self.inner.closed.load(Ordering::Acquire) {
            if let Some(op) = self.inner.take(id) {
                op.deadline.abort();
                metrics.operations_completed.inc(&[("outcome", "shutdown")]);
                (op.on_complete)(Err(PromfanError::Shutdown));
            }
            return id;
        }
        tracing::debug!(correlation_id = %id, expected, ?timeout, "scatter-gather started");

        self.spawn_dispatch(id, targets);
        id
    }

    /// Start and await the result.
    pub async fn gather(
        &self,
        targets: impl IntoIterator<Item = WorkerId>,
        timeout: Duration,
    ) -> Result<MergedSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.start(targets, timeout, move |res| {
            let _ = tx.send(res);
        });
        rx.await
            .map_err(|_| PromfanError::Internal("completion dropped without result".into()))?
    }

    /// Route one worker reply to its operation. Replies for unknown or
    /// already finalized operations are dropped.
    pub fn on_reply(&self, id: CorrelationId, snapshot: Snapshot) {
        let op = match self.inner.pending.entry(id) {
            Entry::Vacant(_) => {
                tracing::debug!(correlation_id = %id, "discarding reply for unknown or finalized operation");
                self.inner.metrics.replies_discarded.inc(&[]);
                return;
            }
            Entry::Occupied(mut e) => {
                if !e.get_mut().record(snapshot) {
                    return;
                }
                e.remove()
            }
        };
        op.deadline.abort();
        self.inner.complete(id, op);
    }

    /// Fail every pending operation with `Shutdown` and refuse new ones.
    /// Returns the number of operations drained.
    pub fn drain(&self) -> usize {
        self.inner.closed.store(true, Ordering::Release);
        let ids: Vec<CorrelationId> = self.inner.pending.iter().map(|e| *e.key()).collect();
        let mut drained = 0;
        for id in ids {
            let Some(op) = self.inner.take(id) else { continue };
            op.deadline.abort();
            self.inner.metrics.operations_completed.inc(&[("outcome", "shutdown")]);
            (op.on_complete)(Err(PromfanError::Shutdown));
            drained += 1;
        }
        if drained > 0 {
            tracing::info!(drained, "pending scatter-gather operations failed on shutdown");
        }
        drained
    }

    pub fn pending_len(&self) -> usize {
        self.inner.pending.len()
    }

    pub fn is_pending(&self, id: CorrelationId) -> bool {
        self.inner.pending.contains_key(&id)
    }

    fn spawn_deadline(&self, id: CorrelationId, timeout: Duration) -> AbortHandle {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(inner) = inner.upgrade() {
                inner.expire(id);
            }
        })
        .abort_handle()
    }

    fn spawn_dispatch(&self, id: CorrelationId, targets: BTreeSet<WorkerId>) {
        let bus = Arc::clone(&self.inner.bus);
        let metrics = Arc::clone(&self.inner.metrics);
        tokio::spawn(async move {
            let mut sends = FuturesUnordered::new();
            for target in targets {
                let bus = Arc::clone(&bus);
                sends.push(async move { (target, bus.send(target, id).await) });
            }
            while let Some((target, res)) = sends.next().await {
                if let Err(e) = res {
                    tracing::warn!(correlation_id = %id, worker_id = %target, error = %e, "send worker message error");
                    metrics.dispatch_failures.inc(&[]);
                }
            }
        });
    }
}

impl Inner {
    fn take(&self, id: CorrelationId) -> Option<PendingOperation> {
        let (_, op) = self.pending.remove(&id)?;
        self.metrics.pending_operations.dec(&[]);
        Some(op)
    }

    fn expire(&self, id: CorrelationId) {
        let Some(op) = self.take(id) else { return };
        tracing::warn!(
            correlation_id = %id,
            missing = op.expected,
            received = op.received.len(),
            "scatter-gather timed out"
        );
        self.metrics.operations_completed.inc(&[("outcome", "timeout")]);
        self.metrics
            .gather_duration
            .observe(&[("outcome", "timeout")], op.started.elapsed());
        (op.on_complete)(Err(PromfanError::Timeout));
    }

    /// All replies arrived; the entry is already out of the registry.
    fn complete(&self, id: CorrelationId, op: PendingOperation) {
        self.metrics.pending_operations.dec(&[]);
        let result = self.aggregator.merge(&op.received);
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => {
                tracing::warn!(correlation_id = %id, error = %e, "aggregation failed");
                "aggregation"
            }
        };
        self.metrics.operations_completed.inc(&[("outcome", outcome)]);
        self.metrics
            .gather_duration
            .observe(&[("outcome", outcome)], op.started.elapsed());
        tracing::debug!(correlation_id = %id, replies = op.received.len(), outcome, "scatter-gather finished");
        (op.on_complete)(result);
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        for (_, op) in std::mem::take(&mut self.pending) {
            op.deadline.abort();
            (op.on_complete)(Err(PromfanError::Shutdown));
        }
    }
}
