//! Axum router wiring.
//!
//! Scrape endpoint, operational endpoints, and the worker WebSocket upgrade.

use axum::{routing::get, Router};

use crate::{app_state::AppState, ops, scrape, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(scrape::metrics))
        .route("/online", get(ops::online))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/gateway/metrics", get(ops::gateway_metrics))
        .route("/v1/workers", get(transport::ws::worker_upgrade))
        .with_state(state)
}
