//! `/metrics` entry point: resolve targets, scatter-gather, respond.
//!
//! - no selector       => every worker of the default group
//! - `?group=<name>`   => every worker of that group
//! - `?worker=<id>`    => that single worker

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use promfan_core::error::{ClientCode, PromfanError, Result};
use promfan_core::metrics::{MergedSnapshot, CONTENT_TYPE};
use promfan_core::WorkerId;

use crate::app_state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ScrapeQuery {
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub worker: Option<u64>,
}

pub async fn metrics(State(state): State<AppState>, Query(q): Query<ScrapeQuery>) -> Response {
    match scrape(&state, q).await {
        Ok(merged) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, CONTENT_TYPE)],
            merged.render(),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// Resolve the target set and run one correlated scatter-gather.
pub async fn scrape(state: &AppState, q: ScrapeQuery) -> Result<MergedSnapshot> {
    let targets = resolve_targets(state, q).await?;
    state.correlator().gather(targets, state.request_timeout()).await
}

async fn resolve_targets(state: &AppState, q: ScrapeQuery) -> Result<Vec<WorkerId>> {
    match (q.group, q.worker) {
        (Some(_), Some(_)) => Err(PromfanError::BadRequest(
            "group and worker selectors are mutually exclusive".into(),
        )),
        (None, Some(id)) => Ok(vec![WorkerId(id)]),
        (group, None) => {
            let group = group.unwrap_or_else(|| state.cfg().default_group().to_string());
            let targets = state.directory().list_group(&group).await?;
            tracing::debug!(%group, workers = targets.len(), "resolved scrape targets");
            Ok(targets)
        }
    }
}

pub fn status_for(code: ClientCode) -> StatusCode {
    match code {
        ClientCode::BadRequest => StatusCode::BAD_REQUEST,
        ClientCode::DiscoveryFailed => StatusCode::NOT_FOUND,
        ClientCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ClientCode::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
        ClientCode::AggregationFailed | ClientCode::DispatchFailed | ClientCode::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(e: &PromfanError) -> Response {
    let code = e.client_code();
    tracing::warn!(code = code.as_str(), error = %e, "scrape failed");
    (status_for(code), e.to_string()).into_response()
}
