//! WebSocket adapter for the core `Transport` trait.

use axum::extract::ws::{Message, WebSocket};
use futures_util::SinkExt;
use futures_util::stream::SplitSink;
use tokio::sync::Mutex;

use relay_core::connection::Transport;
use relay_types::error::TransportError;

/// Write half of an upgraded socket.
///
/// The sink is behind a mutex so the registry can write from whichever task
/// holds the handle.
pub struct WsTransport {
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

impl WsTransport {
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }
}

impl Transport for WsTransport {
    async fn send_text(&self, payload: String) -> Result<(), TransportError> {
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(payload.into()))
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut sink = self.sink.lock().await;
        // The peer may already be gone; the close frame is best-effort.
        let _ = sink.send(Message::Close(None)).await;
        sink.close()
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }
}
