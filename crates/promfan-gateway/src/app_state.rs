//! Shared application state for the promfan gateway.
//!
//! Owns the worker registry, the correlator, and the gateway's own metrics.
//! The correlator is created with the state and drained when the state
//! begins shutting down.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use promfan_core::error::Result;
use promfan_core::metrics::{Aggregator, PromAggregator};

use crate::config::GatewayConfig;
use crate::correlator::Correlator;
use crate::obs::metrics::GatewayMetrics;
use crate::workers::{MessageBus, WorkerDirectory, WorkerRegistry};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    workers: Arc<WorkerRegistry>,
    correlator: Correlator,
    metrics: Arc<GatewayMetrics>,
    shutdown: watch::Sender<bool>,
}

impl AppState {
    /// Build application state with the default prom-client aggregator.
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        Self::with_aggregator(cfg, Arc::new(PromAggregator))
    }

    pub fn with_aggregator(cfg: GatewayConfig, aggregator: Arc<dyn Aggregator>) -> Result<Self> {
        cfg.validate()?;

        let workers = Arc::new(WorkerRegistry::new(&cfg.groups));
        let metrics = Arc::new(GatewayMetrics::default());
        let bus: Arc<dyn MessageBus> = workers.clone();
        let correlator = Correlator::new(bus, aggregator, Arc::clone(&metrics));
        let (shutdown, _) = watch::channel(false);

        tracing::info!(
            groups = cfg.groups.len(),
            default_group = %cfg.default_group(),
            request_timeout_ms = cfg.gateway.request_timeout_ms,
            "gateway state ready"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner { cfg, workers, correlator, metrics, shutdown }),
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn request_timeout(&self) -> Duration {
        self.inner.cfg.gateway.request_timeout()
    }

    pub fn workers(&self) -> Arc<WorkerRegistry> {
        Arc::clone(&self.inner.workers)
    }

    pub fn directory(&self) -> &dyn WorkerDirectory {
        self.inner.workers.as_ref()
    }

    pub fn correlator(&self) -> &Correlator {
        &self.inner.correlator
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.inner.metrics
    }

    /// Extra lines appended to `/gateway/metrics`.
    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("promfan_workers_registered", self.inner.workers.len() as u64),
            ("promfan_registry_entries", self.inner.correlator.pending_len() as u64),
        ]
    }

    pub fn is_draining(&self) -> bool {
        self.inner.metrics.is_draining()
    }

    /// Receiver that flips to `true` once shutdown begins.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.inner.shutdown.subscribe()
    }

    /// Mark draining, fail pending operations, and tell worker sessions to close.
    pub fn begin_shutdown(&self) {
        self.inner.metrics.set_draining();
        let drained = self.inner.correlator.drain();
        self.inner.shutdown.send_replace(true);
        tracing::info!(drained, "gateway draining");
    }
}
