//! Worker WebSocket handler.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS and register the worker under a fresh `WorkerId`
//! - Forward queued snapshot requests to the socket
//! - Hand snapshot replies to the correlator
//! - Lifecycle: ping interval, idle timeout, gateway shutdown
//! - Deregister on exit so discovery never returns a dead worker

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, Query, State},
    response::Response,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::Instrument;

use promfan_core::error::{PromfanError, Result};

use crate::app_state::AppState;
use crate::transport::codec::{decode, Inbound};
use crate::workers::WorkerConnection;

#[derive(Debug, Deserialize)]
pub struct WorkerQuery {
    pub app: String,
}

pub async fn worker_upgrade(
    State(app): State<AppState>,
    ws: WebSocketUpgrade,
    Query(q): Query<WorkerQuery>,
) -> Response {
    ws.on_upgrade(move |socket: WebSocket| async move {
        let (ws_tx, ws_rx) = socket.split();
        if let Err(e) = run_worker_session(app, &q.app, ws_tx, ws_rx).await {
            tracing::warn!(error = %e, "worker session ended with error");
        }
    })
}

/// Drive one worker connection until it closes, idles out, or the gateway
/// shuts down. The worker is registered for exactly the session's lifetime.
pub async fn run_worker_session<S, R, E>(
    app: AppState,
    app_name: &str,
    mut ws_tx: S,
    mut ws_rx: R,
) -> Result<()>
where
    S: Sink<Message> + Unpin,
    R: Stream<Item = std::result::Result<Message, E>> + Unpin,
{
    let app_name = app_name.trim().to_string();
    if app_name.is_empty() {
        return Err(PromfanError::BadRequest("app must not be empty".into()));
    }
    // Subscribe before checking so a shutdown in between is still observed.
    let mut shutdown = app.shutdown_signal();
    if *shutdown.borrow() {
        return Err(PromfanError::Shutdown);
    }

    let gw = &app.cfg().gateway;
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(gw.worker_queue);
    let registry = app.workers();
    let worker_id = registry.register(&app_name, WorkerConnection { tx: out_tx.clone() });
    app.metrics().workers_connected.inc(&[("app", app_name.as_str())]);

    let span = tracing::info_span!("worker", worker_id = %worker_id, app = %app_name);
    async {
        tracing::info!("worker connected");

        let ping_every = Duration::from_millis(gw.ping_interval_ms);
        let idle_timeout = Duration::from_millis(gw.idle_timeout_ms);
        let mut ping_tick = tokio::time::interval(ping_every);
        ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last_activity = Instant::now();

        loop {
            tokio::select! {
                // outbound writer
                maybe_out = out_rx.recv() => {
                    let Some(m) = maybe_out else { break; };
                    if ws_tx.send(m).await.is_err() {
                        break;
                    }
                }

                // inbound reader
                incoming = ws_rx.next() => {
                    let Some(Ok(msg)) = incoming else { break; };
                    last_activity = Instant::now();

                    match decode(msg) {
                        Ok(Inbound::Reply(reply)) => {
                            tracing::debug!(correlation_id = %reply.request_id, "snapshot reply");
                            app.correlator().on_reply(reply.request_id, reply.metrics);
                        }
                        Ok(Inbound::Ping(payload)) => {
                            let _ = out_tx.try_send(Message::Pong(payload));
                        }
                        Ok(Inbound::Pong(_)) => {}
                        Ok(Inbound::Close) => break,
                        Err(e) => {
                            // A broken frame loses one reply; the operation resolves by timeout.
                            tracing::warn!(error = %e, "undecodable worker frame");
                            app.metrics().worker_frame_errors.inc(&[("app", app_name.as_str())]);
                        }
                    }
                }

                // ping
                _ = ping_tick.tick() => {
                    let _ = out_tx.try_send(Message::Ping(Vec::new()));
                }

                // gateway shutdown
                _ = shutdown.changed() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }

                // idle timeout
                _ = tokio::time::sleep(Duration::from_millis(250)) => {
                    if last_activity.elapsed() >= idle_timeout {
                        tracing::info!("worker idle timeout");
                        break;
                    }
                }
            }
        }
    }
    .instrument(span)
    .await;

    registry.deregister(worker_id);
    app.metrics().workers_connected.dec(&[("app", app_name.as_str())]);
    tracing::info!(worker_id = %worker_id, app = %app_name, "worker disconnected");
    Ok(())
}
