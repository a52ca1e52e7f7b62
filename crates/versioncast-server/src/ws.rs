//! `WebSocket` change feed.
//!
//! Clients connect to `GET /ws` and receive one text frame per published
//! version. By default each frame is the snapshot body encoded as a JSON
//! string; `?format=snapshot` sends the full `{"version", "body"}`
//! object instead.
//!
//! A client that falls behind is not queued for: its next frame is
//! simply the newest version. The connection is closed when the client
//! goes away, a send fails, or the server shuts down.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt as _, StreamExt as _};
use tracing::{debug, info_span, warn, Instrument as _};
use uuid::Uuid;
use versioncast_core::{
    run_observer, CancelSignal, DeliveryError, DeliverySink, DetachReason, Snapshot,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Frame payload shape for the change feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedFormat {
    /// The body as a JSON string.
    #[default]
    Body,
    /// The whole snapshot as a JSON object.
    Snapshot,
}

/// Query parameters for `GET /ws`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct FeedQuery {
    /// Frame payload shape (default `body`).
    pub format: Option<FeedFormat>,
}

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming snapshots.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_feed(
    ws: WebSocketUpgrade,
    Query(query): Query<FeedQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    if state.shutdown.is_cancelled() {
        return ApiError::ShuttingDown.into_response();
    }

    let format = query.format.unwrap_or_default();
    ws.on_failed_upgrade(|e| warn!(error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| {
            let session_id = Uuid::now_v7();
            handle_feed(socket, state, format).instrument(info_span!("feed", %session_id))
        })
}

/// Sends snapshots over the write half of a `WebSocket`.
struct WsSink {
    sender: SplitSink<WebSocket, Message>,
    format: FeedFormat,
}

impl WsSink {
    fn encode(&self, snapshot: &Snapshot) -> Result<String, DeliveryError> {
        let encoded = match self.format {
            FeedFormat::Body => serde_json::to_string(snapshot.body()),
            FeedFormat::Snapshot => serde_json::to_string(snapshot),
        };
        encoded.map_err(|e| DeliveryError::Encode {
            message: e.to_string(),
        })
    }
}

impl DeliverySink for WsSink {
    async fn deliver(&mut self, snapshot: &Snapshot) -> Result<(), DeliveryError> {
        let json = self.encode(snapshot)?;
        self.sender
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| DeliveryError::Transport {
                message: e.to_string(),
            })
    }
}

/// Handle the feed lifecycle: attach to the cell, push snapshots until
/// detach, then close the socket.
async fn handle_feed(socket: WebSocket, state: Arc<AppState>, format: FeedFormat) {
    let (sender, receiver) = socket.split();
    let mut session = state.cell.attach();
    debug!(observers = state.cell.observer_count(), "Feed client connected");

    let cancel = CancelSignal::new();
    let watcher = tokio::spawn(watch_peer(receiver, cancel.clone(), state.shutdown.clone()));

    let mut sink = WsSink { sender, format };
    let reason = run_observer(&mut session, &mut sink, &cancel).await;

    // Stop the reader if the writer side ended first.
    cancel.cancel();
    if let Err(e) = watcher.await {
        warn!(error = %e, "Feed reader task failed");
    }

    match &reason {
        DetachReason::Cancelled => {
            // Best effort: the peer may already be gone.
            if let Err(e) = sink.sender.close().await {
                debug!("WebSocket close failed: {e}");
            }
        }
        DetachReason::DeliveryFailed(e) => {
            debug!(error = %e, "Feed send failed");
        }
    }

    let last_seen = session.last_seen();
    drop(session);
    debug!(
        last_seen,
        observers = state.cell.observer_count(),
        "Feed client detached"
    );
}

/// Watch the read half for the peer going away, and fire `session` when
/// it does or when the server shuts down.
///
/// Client text and binary frames are ignored. Pings are answered by the
/// protocol layer while reading.
async fn watch_peer(
    mut receiver: SplitStream<WebSocket>,
    session: CancelSignal,
    shutdown: CancelSignal,
) {
    loop {
        tokio::select! {
            () = session.cancelled() => break,
            () = shutdown.cancelled() => {
                debug!("Server shutting down, closing feed");
                break;
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    session.cancel();
}
