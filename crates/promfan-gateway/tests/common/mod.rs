//! Helpers shared by gateway integration tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use promfan_core::error::Result;
use promfan_core::metrics::{AggregationMode, MergedSnapshot, MetricFamily, MetricType, Sample, Snapshot};
use tokio::sync::mpsc;

/// One-family counter snapshot.
pub fn counter(name: &str, value: f64) -> Snapshot {
    family(name, MetricType::Counter, value)
}

pub fn family(name: &str, metric_type: MetricType, value: f64) -> Snapshot {
    Snapshot::new(vec![MetricFamily {
        name: name.to_string(),
        help: format!("{name} help"),
        metric_type,
        values: vec![Sample { metric_name: None, labels: Default::default(), value }],
        aggregator: AggregationMode::Sum,
    }])
}

/// Value of the unlabeled sample of `name` in a merged snapshot.
pub fn merged_value(m: &MergedSnapshot, name: &str) -> f64 {
    m.family(name).expect("family present").values[0].value
}

/// Completion that records every invocation.
pub struct Recorder {
    pub calls: Arc<AtomicUsize>,
    pub rx: mpsc::UnboundedReceiver<Result<MergedSnapshot>>,
}

impl Recorder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn recorder() -> (impl FnOnce(Result<MergedSnapshot>) + Send + Sync + 'static, Recorder) {
    let (tx, rx) = mpsc::unbounded_channel();
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let cb = move |res: Result<MergedSnapshot>| {
        c.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send(res);
    };
    (cb, Recorder { calls, rx })
}
