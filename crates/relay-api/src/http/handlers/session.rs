//! Read-only session inspection.

use std::time::Instant;

use axum::extract::{Path, State};
use serde::Serialize;

use relay_types::message::Message;
use relay_types::session::{EventRecord, SessionId, SessionRecord};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionDetail {
    pub session: SessionRecord,
    pub events: Vec<EventRecord>,
    /// Whether a conversation is currently held in memory.
    pub live: bool,
    pub conversation: Vec<Message>,
    pub message_count: usize,
}

/// GET /api/session/{session_id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<ApiResponse<SessionDetail>, AppError> {
    let start = Instant::now();
    let session_id = SessionId::new(raw_id);
    let store = state.coordinator.store();

    let session = store
        .get_session(&session_id)
        .await
        .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()))?;
    let events = store.get_history(&session_id).await;

    let conversations = state.coordinator.conversations();
    let live = conversations.contains(&session_id);
    let conversation = conversations.get(&session_id);

    let detail = SessionDetail {
        session,
        events,
        live,
        message_count: conversation.len(),
        conversation,
    };

    Ok(ApiResponse::success(
        detail,
        uuid::Uuid::now_v7().to_string(),
        start.elapsed().as_millis() as u64,
    ))
}
