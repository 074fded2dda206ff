//! Operational HTTP endpoints.
//!
//! - `/online`          : liveness for external health checks
//! - `/healthz`         : liveness
//! - `/readyz`          : readiness (503 when draining)
//! - `/gateway/metrics` : the gateway's own metrics, Prometheus text format

use axum::{extract::State, http::StatusCode, response::{IntoResponse, Response}};

use promfan_core::metrics::CONTENT_TYPE;

use crate::app_state::AppState;

pub async fn online() -> impl IntoResponse {
    "ok"
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_draining() {
        (StatusCode::SERVICE_UNAVAILABLE, "draining")
    } else {
        (StatusCode::OK, "ready")
    }
}

pub async fn gateway_metrics(State(state): State<AppState>) -> Response {
    let extra = state.metrics_extra();
    let body = state.metrics().render(&extra);

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, CONTENT_TYPE)],
        body,
    )
        .into_response()
}
