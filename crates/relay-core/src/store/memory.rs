//! In-memory session store.
//!
//! Satisfies the same contract as the durable store and never fails. Used
//! on its own when no database is configured, and as the fallback target of
//! [`super::FallbackSessionStore`].

use dashmap::DashMap;

use relay_types::error::RepositoryError;
use relay_types::session::{EventKind, EventRecord, SessionId, SessionRecord, SessionUpdate};

use super::repository::SessionStore;

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<SessionId, SessionRecord>,
    events: DashMap<SessionId, Vec<EventRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl SessionStore for MemorySessionStore {
    async fn create_session(
        &self,
        session_id: &SessionId,
        user_id: Option<&str>,
    ) -> Result<SessionRecord, RepositoryError> {
        let record = self
            .sessions
            .entry(session_id.clone())
            .or_insert_with(|| SessionRecord::new(session_id.clone(), user_id.map(str::to_string)))
            .clone();
        Ok(record)
    }

    async fn get_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<SessionRecord>, RepositoryError> {
        Ok(self.sessions.get(session_id).map(|r| r.clone()))
    }

    async fn update_session(
        &self,
        session_id: &SessionId,
        update: &SessionUpdate,
    ) -> Result<SessionRecord, RepositoryError> {
        let mut record = self
            .sessions
            .get_mut(session_id)
            .ok_or(RepositoryError::NotFound)?;
        record.apply(update);
        Ok(record.clone())
    }

    async fn log_event(
        &self,
        session_id: &SessionId,
        kind: EventKind,
        content: &str,
    ) -> Result<EventRecord, RepositoryError> {
        let event = EventRecord::new(session_id.clone(), kind, content);
        self.events
            .entry(session_id.clone())
            .or_default()
            .push(event.clone());
        Ok(event)
    }

    async fn get_history(&self, session_id: &SessionId) -> Result<Vec<EventRecord>, RepositoryError> {
        Ok(self
            .events
            .get(session_id)
            .map(|events| events.clone())
            .unwrap_or_default())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
