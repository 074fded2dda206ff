//! Counter/gauge/histogram families with dynamic labels backed by `DashMap`.
//!
//! Labels are flattened into sorted key vectors for deterministic identity.
//! Histogram buckets are fixed in milliseconds.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

type LabelKey = Vec<(String, String)>;

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_string(key: &LabelKey) -> String {
    key.iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn write_sample(out: &mut String, name: &str, key: &LabelKey, val: impl std::fmt::Display) {
    if key.is_empty() {
        let _ = writeln!(out, "{} {}", name, val);
    } else {
        let _ = writeln!(out, "{}{{{}}} {}", name, label_string(key), val);
    }
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl CounterVec {
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let counter = self.map.entry(label_key(labels)).or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value for one label set (0 if never touched).
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} counter", name);
        for r in self.map.iter() {
            write_sample(out, name, r.key(), r.value().load(Ordering::Relaxed));
        }
    }
}

#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<LabelKey, AtomicI64>,
}

impl GaugeVec {
    pub fn inc(&self, labels: &[(&str, &str)]) { self.add(labels, 1); }
    pub fn dec(&self, labels: &[(&str, &str)]) { self.add(labels, -1); }

    pub fn add(&self, labels: &[(&str, &str)], v: i64) {
        let gauge = self.map.entry(label_key(labels)).or_insert_with(|| AtomicI64::new(0));
        gauge.fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> i64 {
        self.map
            .get(&label_key(labels))
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} gauge", name);
        for r in self.map.iter() {
            write_sample(out, name, r.key(), r.value().load(Ordering::Relaxed));
        }
    }
}

// 1ms .. 10s; the default request timeout is 5s.
const BUCKETS_MILLIS: [u64; 10] = [1, 5, 10, 50, 100, 250, 500, 1_000, 5_000, 10_000];

#[derive(Default)]
struct AtomicHistogram {
    count: AtomicU64,
    sum: AtomicU64,
    buckets: [AtomicU64; 10],
}

#[derive(Default)]
pub struct HistogramVec {
    map: DashMap<LabelKey, AtomicHistogram>,
}

impl HistogramVec {
    pub fn observe(&self, labels: &[(&str, &str)], duration: Duration) {
        let hist = self.map.entry(label_key(labels)).or_default();
        let millis = duration.as_millis() as u64;

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum.fetch_add(millis, Ordering::Relaxed);
        for (i, &b) in BUCKETS_MILLIS.iter().enumerate() {
            if millis <= b {
                hist.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn count(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|h| h.count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} histogram", name);
        for r in self.map.iter() {
            let key = r.key();
            let hist = r.value();
            let bucket_name = format!("{name}_bucket");
            for (i, &le) in BUCKETS_MILLIS.iter().enumerate() {
                let mut k = key.clone();
                k.push(("le".into(), le.to_string()));
                write_sample(out, &bucket_name, &k, hist.buckets[i].load(Ordering::Relaxed));
            }
            let count = hist.count.load(Ordering::Relaxed);
            let mut k = key.clone();
            k.push(("le".into(), "+Inf".into()));
            write_sample(out, &bucket_name, &k, count);
            write_sample(out, &format!("{name}_sum"), key, hist.sum.load(Ordering::Relaxed));
            write_sample(out, &format!("{name}_count"), key, count);
        }
    }
}

#[derive(Default)]
pub struct GatewayMetrics {
    pub operations_started: CounterVec,
    pub operations_completed: CounterVec,
    pub pending_operations: GaugeVec,
    pub dispatch_failures: CounterVec,
    pub replies_discarded: CounterVec,
    pub gather_duration: HistogramVec, // In Milliseconds
    pub workers_connected: GaugeVec,
    pub worker_frame_errors: CounterVec,
    draining: std::sync::atomic::AtomicBool,
}

impl GatewayMetrics {
    pub fn set_draining(&self) { self.draining.store(true, Ordering::Relaxed); }
    pub fn is_draining(&self) -> bool { self.draining.load(Ordering::Relaxed) }

    /// Render all families plus any extra lines provided by callers.
    pub fn render(&self, extra: &[(&str, u64)]) -> String {
        let mut out = String::new();
        self.operations_started.render("promfan_operations_started_total", &mut out);
        self.operations_completed.render("promfan_operations_completed_total", &mut out);
        self.pending_operations.render("promfan_operations_pending", &mut out);
        self.dispatch_failures.render("promfan_dispatch_failures_total", &mut out);
        self.replies_discarded.render("promfan_replies_discarded_total", &mut out);
        self.gather_duration.render("promfan_gather_duration_millis", &mut out);
        self.workers_connected.render("promfan_workers_connected", &mut out);
        self.worker_frame_errors.render("promfan_worker_frame_errors_total", &mut out);

        let _ = writeln!(out, "# TYPE promfan_draining gauge\npromfan_draining {}", if self.is_draining() { 1 } else { 0 });
        for (k, v) in extra { let _ = writeln!(out, "{} {}", k, v); }
        out
    }
}
