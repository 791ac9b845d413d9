//! Dashboard WebSocket
//!
//! A dashboard sends `{"type":"scan_id","scanId":...}` for the scan it is
//! waiting on and receives `{"type":"scan_complete","reportId":...}` once the
//! report exists. The socket holds its event sender only until the first
//! registration; afterwards the session table owns it, so the socket closes
//! once no session is waiting on it anymore.

use crate::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use gmscan_core::scanner::is_valid_token;
use gmscan_core::SessionEvent;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    ScanId {
        #[serde(rename = "scanId")]
        scan_id: String,
    },
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection = Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut events) = mpsc::unbounded_channel::<SessionEvent>();
    let weak = tx.downgrade();
    let mut unregistered = Some(tx);

    debug!(%connection, "Dashboard socket opened");

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    debug!(%connection, "No session waiting, closing socket");
                    break;
                };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(%connection, error = %err, "Failed to encode session event");
                        continue;
                    }
                };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    let Some(scan_id) = parse_scan_id(&text) else {
                        warn!(%connection, "Ignoring malformed socket message");
                        continue;
                    };
                    let Some(listener) = unregistered.take().or_else(|| weak.upgrade()) else {
                        break;
                    };
                    state.sessions.register(&scan_id, connection, listener);
                    debug!(%connection, scan_id = %scan_id, "Dashboard waiting on scan");
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    }

    let aborted = state.sessions.disconnect(connection);
    if aborted > 0 {
        debug!(%connection, aborted, "Dashboard left before completion");
    }
    let _ = sink.close().await;
}

fn parse_scan_id(text: &str) -> Option<String> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::ScanId { scan_id }) if is_valid_token(&scan_id) => Some(scan_id),
        _ => None,
    }
}
