//! Durable-with-fallback persistence port.
//!
//! Every call goes to the durable store first. Any `Err` (including
//! `NotFound` on update, so sessions created during an outage stay
//! updatable) is logged and the same call is served by the in-memory
//! store. Reads also consult memory when the durable store answers but
//! lacks what an earlier failed write left there. Callers never see a
//! storage error.

use tracing::{debug, warn};

use relay_types::error::RepositoryError;
use relay_types::session::{EventKind, EventRecord, SessionId, SessionRecord, SessionUpdate};

use super::memory::MemorySessionStore;
use super::repository::SessionStore;

/// Persistence port used by the session core.
pub struct FallbackSessionStore<D> {
    durable: Option<D>,
    memory: MemorySessionStore,
}

impl<D: SessionStore> FallbackSessionStore<D> {
    /// Wrap a durable store.
    pub fn new(durable: D) -> Self {
        Self {
            durable: Some(durable),
            memory: MemorySessionStore::new(),
        }
    }

    /// No durable store configured; every call is served from memory.
    pub fn in_memory() -> Self {
        Self {
            durable: None,
            memory: MemorySessionStore::new(),
        }
    }

    pub fn has_durable(&self) -> bool {
        self.durable.is_some()
    }

    pub async fn create_session(&self, session_id: &SessionId, user_id: Option<&str>) -> SessionRecord {
        if let Ok(Some(existing)) = self.memory.get_session(session_id).await {
            return existing;
        }
        if let Some(durable) = &self.durable {
            match durable.create_session(session_id, user_id).await {
                Ok(record) => return record,
                Err(e) => degraded("create_session", session_id, &e),
            }
        }
        // The memory store cannot fail; this arm only satisfies the trait signature.
        match self.memory.create_session(session_id, user_id).await {
            Ok(record) => record,
            Err(_) => SessionRecord::new(session_id.clone(), user_id.map(str::to_string)),
        }
    }

    pub async fn get_session(&self, session_id: &SessionId) -> Option<SessionRecord> {
        if let Some(durable) = &self.durable {
            match durable.get_session(session_id).await {
                Ok(Some(record)) => return Some(record),
                Ok(None) => {}
                Err(e) => degraded("get_session", session_id, &e),
            }
        }
        self.memory.get_session(session_id).await.ok().flatten()
    }

    /// Returns `None` only when neither store knows the session.
    pub async fn update_session(
        &self,
        session_id: &SessionId,
        update: &SessionUpdate,
    ) -> Option<SessionRecord> {
        if let Some(durable) = &self.durable {
            match durable.update_session(session_id, update).await {
                Ok(record) => return Some(record),
                Err(e) => degraded("update_session", session_id, &e),
            }
        }
        match self.memory.update_session(session_id, update).await {
            Ok(record) => Some(record),
            Err(_) => {
                warn!(session_id = %session_id, "update for unknown session dropped");
                None
            }
        }
    }

    pub async fn log_event(&self, session_id: &SessionId, kind: EventKind, content: &str) -> EventRecord {
        if let Some(durable) = &self.durable {
            match durable.log_event(session_id, kind, content).await {
                Ok(event) => return event,
                Err(e) => degraded("log_event", session_id, &e),
            }
        }
        match self.memory.log_event(session_id, kind, content).await {
            Ok(event) => event,
            Err(_) => EventRecord::new(session_id.clone(), kind, content),
        }
    }

    /// Durable and in-memory events for the session, merged by `created_at`.
    pub async fn get_history(&self, session_id: &SessionId) -> Vec<EventRecord> {
        let mut events = match &self.durable {
            Some(durable) => match durable.get_history(session_id).await {
                Ok(events) => events,
                Err(e) => {
                    degraded("get_history", session_id, &e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        let fallback = self.memory.get_history(session_id).await.unwrap_or_default();
        if !fallback.is_empty() {
            events.extend(fallback);
            // Stable, so each store's own insertion order survives timestamp ties.
            events.sort_by_key(|e| e.created_at);
        }
        events
    }

    /// Health of the durable store, or `true` when running in memory only.
    pub async fn health_check(&self) -> bool {
        match &self.durable {
            Some(durable) => durable.health_check().await,
            None => self.memory.health_check().await,
        }
    }
}

fn degraded(operation: &str, session_id: &SessionId, error: &RepositoryError) {
    match error {
        RepositoryError::NotFound => {
            debug!(operation, session_id = %session_id, "not in durable store, trying in-memory store");
        }
        _ => {
            warn!(
                operation,
                session_id = %session_id,
                error = %error,
                "durable store failed, serving from in-memory store"
            );
        }
    }
}
