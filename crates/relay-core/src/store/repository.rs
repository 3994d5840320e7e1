//! SessionStore trait definition.
//!
//! Session rows and the append-only event log, keyed by session id.

use relay_types::error::RepositoryError;
use relay_types::session::{EventKind, EventRecord, SessionId, SessionRecord, SessionUpdate};

/// Repository trait for session and event-log persistence.
///
/// Implementations: `SqliteSessionStore` in relay-infra, [`super::MemorySessionStore`]
/// here. Both must behave identically apart from backend-assigned ids.
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait SessionStore: Send + Sync {
    /// Create the session row, or return the existing one unchanged.
    fn create_session(
        &self,
        session_id: &SessionId,
        user_id: Option<&str>,
    ) -> impl std::future::Future<Output = Result<SessionRecord, RepositoryError>> + Send;

    /// Get a session by its id. `Ok(None)` if unknown.
    fn get_session(
        &self,
        session_id: &SessionId,
    ) -> impl std::future::Future<Output = Result<Option<SessionRecord>, RepositoryError>> + Send;

    /// Partial update. Unset fields are left unchanged.
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    fn update_session(
        &self,
        session_id: &SessionId,
        update: &SessionUpdate,
    ) -> impl std::future::Future<Output = Result<SessionRecord, RepositoryError>> + Send;

    /// Append an event to the session's log.
    fn log_event(
        &self,
        session_id: &SessionId,
        kind: EventKind,
        content: &str,
    ) -> impl std::future::Future<Output = Result<EventRecord, RepositoryError>> + Send;

    /// Event log for a session in ascending creation order.
    fn get_history(
        &self,
        session_id: &SessionId,
    ) -> impl std::future::Future<Output = Result<Vec<EventRecord>, RepositoryError>> + Send;

    /// Liveness probe. Never errors.
    fn health_check(&self) -> impl std::future::Future<Output = bool> + Send;
}
