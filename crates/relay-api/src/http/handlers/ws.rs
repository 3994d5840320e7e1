//! WebSocket handler for conversational sessions.
//!
//! `/ws/session/{session_id}` upgrades to a WebSocket and hands the socket to
//! the session coordinator. The id `new` (or an empty id) allocates a fresh
//! one. The read half is pumped by a separate task into a channel so the
//! coordinator sees inbound frames in order and learns about a closed socket
//! even while a reply is streaming.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use futures_util::StreamExt;
use futures_util::stream::SplitStream;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use relay_types::session::SessionId;

use crate::http::transport::WsTransport;
use crate::state::AppState;

/// Inbound frames buffered while a turn is being streamed.
const INBOUND_BUFFER: usize = 32;

#[derive(Debug, Default, Deserialize)]
pub struct ConnectQuery {
    pub user_id: Option<String>,
}

/// Upgrade an HTTP request to a session WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(raw_id): Path<String>,
    Query(query): Query<ConnectQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let session_id = SessionId::resolve(&raw_id);
    let user_id = query.user_id.filter(|u| !u.trim().is_empty());
    let tracker = state.sessions.clone();
    ws.on_upgrade(move |socket| {
        tracker.track_future(handle_socket(socket, session_id, user_id, state))
    })
}

async fn handle_socket(
    socket: WebSocket,
    session_id: SessionId,
    user_id: Option<String>,
    state: AppState,
) {
    let (sink, stream) = socket.split();
    let (tx, rx) = mpsc::channel(INBOUND_BUFFER);
    let disconnected = state.shutdown.child_token();

    let reader = tokio::spawn(pump_inbound(stream, tx, disconnected.clone()));

    state
        .coordinator
        .run_session(
            session_id,
            user_id,
            WsTransport::new(sink),
            rx,
            disconnected,
        )
        .await;

    reader.abort();
}

/// Forward text frames until the socket closes, then cancel `disconnected`.
async fn pump_inbound(
    mut stream: SplitStream<WebSocket>,
    tx: mpsc::Sender<String>,
    disconnected: CancellationToken,
) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if tx.send(text.as_str().to_owned()).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Binary(_)) => {
                tracing::debug!("binary frame ignored");
            }
            // Ping/pong are answered by axum.
            Ok(_) => {}
            Err(err) => {
                tracing::debug!("WebSocket receive error: {err}");
                break;
            }
        }
    }
    disconnected.cancel();
}
