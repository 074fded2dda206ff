//! Worker session lifecycle over an in-memory socket pair.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::ws::Message;
use futures_util::{sink, stream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use promfan_core::error::{PromfanError, Result};
use promfan_core::protocol::{GatewayFrame, MetricsReply, WorkerFrame};
use promfan_core::CorrelationId;
use promfan_gateway::app_state::AppState;
use promfan_gateway::config;
use promfan_gateway::scrape::{scrape, ScrapeQuery};
use promfan_gateway::transport::ws::run_worker_session;
use promfan_gateway::workers::WorkerDirectory;

use common::{counter, merged_value};

const CFG: &str = r#"
version: 1
gateway:
  request_timeout_ms: 2000
groups:
  - name: "api-cluster"
    apps: ["api"]
"#;

fn state() -> AppState {
    AppState::new(config::load_from_str(CFG).unwrap()).unwrap()
}

/// The worker end of one session.
struct Peer {
    to_gateway: mpsc::UnboundedSender<std::result::Result<Message, Infallible>>,
    from_gateway: mpsc::UnboundedReceiver<Message>,
    session: JoinHandle<Result<()>>,
}

fn connect(state: &AppState, app: &str) -> Peer {
    let (to_gateway, in_rx) = mpsc::unbounded_channel();
    let (out_tx, from_gateway) = mpsc::unbounded_channel::<Message>();

    let ws_rx = Box::pin(stream::unfold(in_rx, |mut rx| async move {
        rx.recv().await.map(|m| (m, rx))
    }));
    let ws_tx = Box::pin(sink::unfold(out_tx, |tx, m: Message| async move {
        tx.send(m).map(|()| tx).map_err(|_| ())
    }));

    let (state, app) = (state.clone(), app.to_string());
    let session = tokio::spawn(async move { run_worker_session(state, &app, ws_tx, ws_rx).await });
    Peer { to_gateway, from_gateway, session }
}

impl Peer {
    fn send(&self, m: Message) {
        self.to_gateway.send(Ok(m)).unwrap();
    }

    fn reply(&self, id: CorrelationId, value: f64) {
        let frame = WorkerFrame::Metrics(MetricsReply {
            request_id: id,
            metrics: counter("requests_total", value),
        });
        self.send(Message::Text(frame.encode().unwrap()));
    }

    /// Next snapshot request, skipping keepalive frames.
    async fn next_request(&mut self) -> CorrelationId {
        loop {
            if let Message::Text(s) = self.from_gateway.recv().await.expect("session open") {
                let GatewayFrame::GetMetrics(req) = GatewayFrame::decode(&s).unwrap();
                return req.request_id;
            }
        }
    }
}

async fn wait_for_workers(state: &AppState, n: usize) {
    while state.workers().len() != n {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn reply_frames_complete_the_scrape() {
    let s = state();
    let mut peer = connect(&s, "api");
    wait_for_workers(&s, 1).await;
    assert_eq!(s.metrics().workers_connected.get(&[("app", "api")]), 1);

    let s2 = s.clone();
    let pending = tokio::spawn(async move { scrape(&s2, ScrapeQuery::default()).await });
    let id = peer.next_request().await;
    peer.reply(id, 7.0);

    let merged = pending.await.unwrap().unwrap();
    assert_eq!(merged_value(&merged, "requests_total"), 7.0);
}

#[tokio::test(start_paused = true)]
async fn undecodable_frames_are_counted_and_skipped() {
    let s = state();
    let mut peer = connect(&s, "api");
    wait_for_workers(&s, 1).await;

    peer.send(Message::Text("not a frame".into()));
    peer.send(Message::Binary(vec![1, 2, 3]));

    let s2 = s.clone();
    let pending = tokio::spawn(async move { scrape(&s2, ScrapeQuery::default()).await });
    let id = peer.next_request().await;
    peer.reply(id, 3.0);

    let merged = pending.await.unwrap().unwrap();
    assert_eq!(merged_value(&merged, "requests_total"), 3.0);
    assert_eq!(s.metrics().worker_frame_errors.get(&[("app", "api")]), 2);
    assert_eq!(s.workers().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn worker_ping_is_answered_with_pong() {
    let s = state();
    let mut peer = connect(&s, "api");
    wait_for_workers(&s, 1).await;

    peer.send(Message::Ping(vec![9]));
    loop {
        match peer.from_gateway.recv().await.unwrap() {
            Message::Pong(payload) => {
                assert_eq!(payload, vec![9]);
                break;
            }
            Message::Ping(_) => continue,
            other => panic!("unexpected frame {other:?}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn disconnect_deregisters_the_worker() {
    let s = state();
    let Peer { to_gateway, from_gateway: _keep, session } = connect(&s, "api");
    wait_for_workers(&s, 1).await;
    assert_eq!(s.workers().list_group("api-cluster").await.unwrap().len(), 1);

    drop(to_gateway);
    session.await.unwrap().unwrap();

    assert!(s.workers().is_empty());
    assert!(s.workers().list_group("api-cluster").await.unwrap().is_empty());
    assert_eq!(s.metrics().workers_connected.get(&[("app", "api")]), 0);

    // with the only worker gone the default group is vacuous
    let merged = scrape(&s, ScrapeQuery::default()).await.unwrap();
    assert!(merged.is_empty());
}

#[tokio::test(start_paused = true)]
async fn gateway_shutdown_closes_open_sessions() {
    let s = state();
    let mut peer = connect(&s, "api");
    wait_for_workers(&s, 1).await;

    s.begin_shutdown();
    (&mut peer.session).await.unwrap().unwrap();

    let mut saw_close = false;
    while let Ok(m) = peer.from_gateway.try_recv() {
        saw_close |= matches!(m, Message::Close(_));
    }
    assert!(saw_close);
    assert!(s.workers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn sessions_are_refused_once_draining() {
    let s = state();
    s.begin_shutdown();

    let peer = connect(&s, "api");
    assert_eq!(peer.session.await.unwrap().unwrap_err(), PromfanError::Shutdown);
    assert!(s.workers().is_empty());
    assert_eq!(s.metrics().workers_connected.get(&[("app", "api")]), 0);
}

#[tokio::test(start_paused = true)]
async fn blank_app_name_is_rejected() {
    let s = state();
    let peer = connect(&s, "   ");
    let err = peer.session.await.unwrap().unwrap_err();
    assert!(matches!(err, PromfanError::BadRequest(_)), "{err:?}");
    assert!(s.workers().is_empty());
}
