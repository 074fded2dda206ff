//! Metric snapshots and aggregation.
//!
//! A worker reports its metrics as a [`Snapshot`]: the JSON shape produced by
//! prom-client's `getMetricsAsJSON()`. The gateway combines the snapshots of
//! every worker through an [`Aggregator`] into a [`MergedSnapshot`], which is
//! rendered in the Prometheus text exposition format.

mod aggregate;
mod snapshot;

pub use aggregate::{Aggregator, PromAggregator};
pub use snapshot::{AggregationMode, LabelValue, MergedSnapshot, MetricFamily, MetricType, Sample, Snapshot};

/// Content type of [`MergedSnapshot::render`] output.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";
