//! promfan core: transport-agnostic worker protocol, metric snapshot model,
//! aggregation, and the shared error type.
//!
//! This crate carries no runtime or transport dependencies so the aggregation
//! rules can be exercised in isolation and reused by worker-side tooling.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed worker payloads surface as `PromfanError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod metrics;
pub mod protocol;

/// Shared result type.
pub use error::{Result, PromfanError};
pub use protocol::{CorrelationId, WorkerId};
