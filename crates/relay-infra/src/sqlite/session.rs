//! SQLite session store.
//!
//! Implements `SessionStore` from `relay-core` using sqlx with split
//! read/write pools. Timestamps are stored as RFC 3339 text.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use relay_core::store::SessionStore;
use relay_types::error::RepositoryError;
use relay_types::session::{
    EventKind, EventRecord, SessionId, SessionRecord, SessionState, SessionUpdate,
};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SessionStore`.
pub struct SqliteSessionStore {
    pool: DatabasePool,
}

impl SqliteSessionStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

/// Internal row type for mapping SQLite rows to [`SessionRecord`].
struct SessionRow {
    id: String,
    session_id: String,
    user_id: Option<String>,
    state: String,
    started_at: String,
    ended_at: Option<String>,
    duration_seconds: Option<i64>,
    summary: Option<String>,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            user_id: row.try_get("user_id")?,
            state: row.try_get("state")?,
            started_at: row.try_get("started_at")?,
            ended_at: row.try_get("ended_at")?,
            duration_seconds: row.try_get("duration_seconds")?,
            summary: row.try_get("summary")?,
        })
    }

    fn into_record(self) -> Result<SessionRecord, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid session row id: {e}")))?;
        let state: SessionState = self.state.parse().map_err(RepositoryError::Query)?;

        Ok(SessionRecord {
            id,
            session_id: SessionId::new(self.session_id),
            user_id: self.user_id,
            state,
            started_at: parse_datetime(&self.started_at)?,
            ended_at: self.ended_at.as_deref().map(parse_datetime).transpose()?,
            duration_seconds: self.duration_seconds,
            summary: self.summary,
        })
    }
}

struct EventRow {
    id: String,
    session_id: String,
    kind: String,
    content: String,
    created_at: String,
}

impl EventRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            kind: row.try_get("kind")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_record(self) -> Result<EventRecord, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid event id: {e}")))?;
        let kind: EventKind = self.kind.parse().map_err(RepositoryError::Query)?;

        Ok(EventRecord {
            id,
            session_id: SessionId::new(self.session_id),
            kind,
            content: self.content,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn map_sqlx_error(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::Connection
        }
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        other => RepositoryError::Query(other.to_string()),
    }
}

const SELECT_SESSION: &str = "SELECT id, session_id, user_id, state, started_at, ended_at, duration_seconds, summary
     FROM sessions WHERE session_id = ?";

impl SessionStore for SqliteSessionStore {
    async fn create_session(
        &self,
        session_id: &SessionId,
        user_id: Option<&str>,
    ) -> Result<SessionRecord, RepositoryError> {
        let record = SessionRecord::new(session_id.clone(), user_id.map(str::to_string));

        sqlx::query(
            "INSERT INTO sessions (id, session_id, user_id, state, started_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(session_id) DO NOTHING",
        )
        .bind(record.id.to_string())
        .bind(session_id.as_str())
        .bind(user_id)
        .bind(record.state.to_string())
        .bind(format_datetime(&record.started_at))
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        // Read back from the writer: an existing row wins over the fresh one.
        let row = sqlx::query(SELECT_SESSION)
            .bind(session_id.as_str())
            .fetch_one(&self.pool.writer)
            .await
            .map_err(map_sqlx_error)?;

        SessionRow::from_row(&row)
            .map_err(map_sqlx_error)?
            .into_record()
    }

    async fn get_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<SessionRecord>, RepositoryError> {
        let row = sqlx::query(SELECT_SESSION)
            .bind(session_id.as_str())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        match row {
            Some(row) => {
                let record = SessionRow::from_row(&row)
                    .map_err(map_sqlx_error)?
                    .into_record()?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn update_session(
        &self,
        session_id: &SessionId,
        update: &SessionUpdate,
    ) -> Result<SessionRecord, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query(SELECT_SESSION)
            .bind(session_id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepositoryError::NotFound)?;

        let mut record = SessionRow::from_row(&row)
            .map_err(map_sqlx_error)?
            .into_record()?;
        record.apply(update);

        sqlx::query(
            "UPDATE sessions SET state = ?, ended_at = ?, duration_seconds = ?, summary = ?
             WHERE session_id = ?",
        )
        .bind(record.state.to_string())
        .bind(record.ended_at.as_ref().map(format_datetime))
        .bind(record.duration_seconds)
        .bind(&record.summary)
        .bind(session_id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(record)
    }

    async fn log_event(
        &self,
        session_id: &SessionId,
        kind: EventKind,
        content: &str,
    ) -> Result<EventRecord, RepositoryError> {
        let event = EventRecord::new(session_id.clone(), kind, content);

        sqlx::query(
            "INSERT INTO event_logs (id, session_id, kind, content, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(event.id.to_string())
        .bind(session_id.as_str())
        .bind(kind.to_string())
        .bind(content)
        .bind(format_datetime(&event.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        Ok(event)
    }

    async fn get_history(&self, session_id: &SessionId) -> Result<Vec<EventRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, session_id, kind, content, created_at
             FROM event_logs WHERE session_id = ? ORDER BY seq ASC",
        )
        .bind(session_id.as_str())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| {
                EventRow::from_row(row)
                    .map_err(map_sqlx_error)?
                    .into_record()
            })
            .collect()
    }

    async fn health_check(&self) -> bool {
        self.pool.ping().await
    }
}
