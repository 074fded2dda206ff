//! promfan gateway
//!
//! - GET /metrics: fan out to every connected worker of a group, merge, respond
//! - WS /v1/workers?app=...: worker connections
//! - Graceful shutdown on Ctrl-C: pending scrapes fail fast, workers are closed

use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};

use promfan_core::error::{PromfanError, Result};
use promfan_gateway::{app_state::AppState, config, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, code = e.client_code().as_str(), "promfan-gateway failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = config::config_path();
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg
        .gateway
        .listen
        .parse()
        .map_err(|e| PromfanError::BadRequest(format!("gateway.listen must be a valid SocketAddr: {e}")))?;

    let state = AppState::new(cfg)?;
    let app = router::build_router(state.clone());

    tracing::info!(%listen, config = %path, "promfan-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| PromfanError::Internal(format!("failed to bind {listen}: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown(state))
        .await
        .map_err(|e| PromfanError::Internal(format!("server failed: {e}")))?;

    tracing::info!("promfan-gateway stopped");
    Ok(())
}

async fn shutdown(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
    state.begin_shutdown();
}
