//! Session and event-log types.
//!
//! A session is the logical identity of one conversation. Its id is the sole
//! join key between the conversation store, the connection registry, and the
//! persistence port.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Opaque, immutable session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh, time-sortable id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Resolve an id taken from a connection path.
    ///
    /// `new` and the empty string ask the server to allocate an id.
    pub fn resolve(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("new") {
            Self::generate()
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Lifecycle state of a session record.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (state IN ('active', 'closed'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Active,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Active => write!(f, "active"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

impl FromStr for SessionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(SessionState::Active),
            "closed" => Ok(SessionState::Closed),
            other => Err(format!("invalid session state: '{other}'")),
        }
    }
}

/// A persisted session row.
///
/// `id` is assigned by the backing store; `session_id` is the client-facing key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub session_id: SessionId,
    pub user_id: Option<String>,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub summary: Option<String>,
}

impl SessionRecord {
    /// A fresh active record starting now.
    pub fn new(session_id: SessionId, user_id: Option<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            session_id,
            user_id,
            state: SessionState::Active,
            started_at: Utc::now(),
            ended_at: None,
            duration_seconds: None,
            summary: None,
        }
    }

    /// Apply a partial update. Unset fields are left unchanged; setting
    /// `ended_at` closes the session.
    pub fn apply(&mut self, update: &SessionUpdate) {
        if let Some(ended_at) = update.ended_at {
            self.ended_at = Some(ended_at);
            self.state = SessionState::Closed;
        }
        if let Some(duration) = update.duration_seconds {
            self.duration_seconds = Some(duration);
        }
        if let Some(summary) = &update.summary {
            self.summary = Some(summary.clone());
        }
    }
}

/// Partial update for a session record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub summary: Option<String>,
}

impl SessionUpdate {
    pub fn is_empty(&self) -> bool {
        self.ended_at.is_none() && self.duration_seconds.is_none() && self.summary.is_none()
    }
}

/// Whole seconds between two instants, rounded to nearest.
pub fn duration_seconds(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> i64 {
    let millis = (ended_at - started_at).num_milliseconds();
    (millis as f64 / 1000.0).round() as i64
}

/// Kind of an event-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    UserMessage,
    AiResponse,
    ToolCall,
    System,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::UserMessage => write!(f, "user_message"),
            EventKind::AiResponse => write!(f, "ai_response"),
            EventKind::ToolCall => write!(f, "tool_call"),
            EventKind::System => write!(f, "system"),
        }
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user_message" => Ok(EventKind::UserMessage),
            "ai_response" => Ok(EventKind::AiResponse),
            "tool_call" => Ok(EventKind::ToolCall),
            "system" => Ok(EventKind::System),
            other => Err(format!("invalid event kind: '{other}'")),
        }
    }
}

/// One append-only event-log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Uuid,
    pub session_id: SessionId,
    pub kind: EventKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl EventRecord {
    pub fn new(session_id: SessionId, kind: EventKind, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            session_id,
            kind,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_resolve_generates_for_new_and_empty() {
        let a = SessionId::resolve("new");
        let b = SessionId::resolve("");
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
        assert!(Uuid::parse_str(b.as_str()).is_ok());
    }

    #[test]
    fn test_resolve_keeps_explicit_id() {
        assert_eq!(SessionId::resolve("abc-123").as_str(), "abc-123");
    }

    #[test]
    fn test_session_state_roundtrip() {
        for state in [SessionState::Active, SessionState::Closed] {
            let parsed: SessionState = state.to_string().parse().unwrap();
            assert_eq!(state, parsed);
        }
        assert!("paused".parse::<SessionState>().is_err());
    }

    #[test]
    fn test_event_kind_roundtrip() {
        for kind in [
            EventKind::UserMessage,
            EventKind::AiResponse,
            EventKind::ToolCall,
            EventKind::System,
        ] {
            let parsed: EventKind = kind.to_string().parse().unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn test_apply_partial_update_leaves_unset_fields() {
        let mut record = SessionRecord::new(SessionId::from("s1"), Some("u1".to_string()));
        record.apply(&SessionUpdate {
            summary: Some("short".to_string()),
            ..Default::default()
        });
        assert_eq!(record.state, SessionState::Active);
        assert_eq!(record.summary.as_deref(), Some("short"));
        assert!(record.ended_at.is_none());

        let ended = record.started_at + Duration::seconds(5);
        record.apply(&SessionUpdate {
            ended_at: Some(ended),
            duration_seconds: Some(5),
            summary: None,
        });
        assert_eq!(record.state, SessionState::Closed);
        assert_eq!(record.duration_seconds, Some(5));
        assert_eq!(record.summary.as_deref(), Some("short"));
    }

    #[test]
    fn test_duration_rounds_to_nearest_second() {
        let start = Utc::now();
        assert_eq!(duration_seconds(start, start + Duration::milliseconds(1499)), 1);
        assert_eq!(duration_seconds(start, start + Duration::milliseconds(1500)), 2);
        assert_eq!(duration_seconds(start, start), 0);
    }
}
