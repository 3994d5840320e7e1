//! ConnectionRegistry: session id -> live transport.
//!
//! At most one connection per session id; registering again supersedes the
//! previous handle, which is closed. A write failure deregisters the failing
//! connection and is reported to the caller only as `false`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use relay_types::protocol::OutboundFrame;
use relay_types::session::SessionId;

use super::transport::{Transport, TransportDyn};

/// Identifies one registration of a transport under a session id.
///
/// Lets a session task release only its own registration after it has been
/// superseded by a newer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

struct Connection {
    id: ConnectionId,
    transport: Arc<dyn TransportDyn>,
    connected_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<SessionId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transport for `session_id`, replacing and closing any prior one.
    pub async fn connect<T: Transport + 'static>(
        &self,
        session_id: &SessionId,
        transport: T,
    ) -> ConnectionId {
        let connection = Connection {
            id: ConnectionId(Uuid::now_v7()),
            transport: Arc::new(transport),
            connected_at: Utc::now(),
        };
        let connection_id = connection.id;

        let previous = self.connections.insert(session_id.clone(), connection);
        if let Some(previous) = previous {
            info!(
                session_id = %session_id,
                previous = %previous.id,
                connected_at = %previous.connected_at,
                "connection superseded"
            );
            if let Err(e) = previous.transport.close_boxed().await {
                debug!(session_id = %session_id, error = %e, "closing superseded transport failed");
            }
        }

        info!(session_id = %session_id, connection_id = %connection_id, "connection registered");
        connection_id
    }

    /// Remove and close whatever is registered for `session_id`. No-op if unknown.
    pub async fn disconnect(&self, session_id: &SessionId) -> bool {
        match self.connections.remove(session_id) {
            Some((_, connection)) => {
                let _ = connection.transport.close_boxed().await;
                info!(session_id = %session_id, "connection removed");
                true
            }
            None => false,
        }
    }

    /// Like [`Self::disconnect`], but only if `connection_id` is still the
    /// current registration. Returns `false` if it was superseded or already gone.
    pub async fn release(&self, session_id: &SessionId, connection_id: ConnectionId) -> bool {
        match self
            .connections
            .remove_if(session_id, |_, c| c.id == connection_id)
        {
            Some((_, connection)) => {
                let _ = connection.transport.close_boxed().await;
                info!(session_id = %session_id, connection_id = %connection_id, "connection released");
                true
            }
            None => false,
        }
    }

    /// Send a frame to whatever is registered for one session. Returns
    /// whether it was delivered.
    ///
    /// A failing transport is deregistered; the error never propagates.
    pub async fn send(&self, session_id: &SessionId, frame: &OutboundFrame) -> bool {
        self.deliver(session_id, None, frame).await
    }

    /// Send a frame only if `connection_id` is still the current registration.
    /// Returns `false` without writing anything once it has been superseded.
    pub async fn send_as(
        &self,
        session_id: &SessionId,
        connection_id: ConnectionId,
        frame: &OutboundFrame,
    ) -> bool {
        self.deliver(session_id, Some(connection_id), frame).await
    }

    async fn deliver(
        &self,
        session_id: &SessionId,
        expected: Option<ConnectionId>,
        frame: &OutboundFrame,
    ) -> bool {
        let Some((connection_id, transport)) = self
            .connections
            .get(session_id)
            .filter(|c| expected.is_none_or(|id| id == c.id))
            .map(|c| (c.id, Arc::clone(&c.transport)))
        else {
            debug!(session_id = %session_id, "send to unregistered or superseded connection dropped");
            return false;
        };

        let Some(payload) = encode(frame) else {
            return false;
        };

        match transport.send_text_boxed(payload).await {
            Ok(()) => true,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "transport write failed, deregistering");
                self.connections
                    .remove_if(session_id, |_, c| c.id == connection_id);
                false
            }
        }
    }

    /// Send a frame to every registered session. Returns the number delivered.
    pub async fn broadcast(&self, frame: &OutboundFrame) -> usize {
        let Some(payload) = encode(frame) else {
            return 0;
        };

        let targets: Vec<(SessionId, ConnectionId, Arc<dyn TransportDyn>)> = self
            .connections
            .iter()
            .map(|entry| (entry.key().clone(), entry.id, Arc::clone(&entry.transport)))
            .collect();

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (session_id, connection_id, transport) in targets {
            match transport.send_text_boxed(payload.clone()).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "broadcast write failed");
                    failed.push((session_id, connection_id));
                }
            }
        }

        for (session_id, connection_id) in failed {
            self.connections
                .remove_if(&session_id, |_, c| c.id == connection_id);
        }
        delivered
    }

    /// Deliver a final frame to a transport that is not (and will not be)
    /// registered, then close it.
    pub async fn reject<T: Transport>(&self, transport: T, frame: &OutboundFrame) {
        if let Some(payload) = encode(frame) {
            if let Err(e) = transport.send_text(payload).await {
                debug!(error = %e, "rejection frame not delivered");
            }
        }
        let _ = transport.close().await;
    }

    pub fn is_connected(&self, session_id: &SessionId) -> bool {
        self.connections.contains_key(session_id)
    }

    /// Whether `connection_id` is the current registration for `session_id`.
    pub fn is_current(&self, session_id: &SessionId, connection_id: ConnectionId) -> bool {
        self.connections
            .get(session_id)
            .is_some_and(|c| c.id == connection_id)
    }

    /// Number of live connections.
    pub fn count(&self) -> usize {
        self.connections.len()
    }
}

fn encode(frame: &OutboundFrame) -> Option<String> {
    match serde_json::to_string(frame) {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!(error = %e, "failed to encode outbound frame");
            None
        }
    }
}
