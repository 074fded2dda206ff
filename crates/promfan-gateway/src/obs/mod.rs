//! Lightweight in-process metrics about the gateway itself.
//!
//! These describe the correlator and worker transport (operations started,
//! outcomes, dispatch failures, connected workers). They are rendered by the
//! `/gateway/metrics` handler and kept separate from the aggregated worker
//! metrics served on `/metrics`.

pub mod metrics;
