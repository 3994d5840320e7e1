//! Post-close conversation summaries.
//!
//! `Summarizer` condenses a closed session's message snapshot into a short
//! summary and writes it back through the persistence port. Work runs on
//! detached tasks tracked by a `TaskTracker`, so it survives the session
//! task that scheduled it and can be drained at shutdown.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use relay_types::message::Message;
use relay_types::session::{SessionId, SessionUpdate, duration_seconds};

use crate::engine::{CompletionEngine, Fragment};
use crate::store::{FallbackSessionStore, SessionStore};

/// At most this many trailing messages go into the prompt.
const MAX_MESSAGES: usize = 10;

/// Each message is cut to this many characters.
const MAX_CONTENT_CHARS: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("backend failed: {0}")]
    Backend(String),

    #[error("backend returned an empty summary")]
    Empty,
}

pub struct Summarizer<D> {
    engine: Arc<CompletionEngine>,
    store: Arc<FallbackSessionStore<D>>,
    tasks: TaskTracker,
}

impl<D: SessionStore + 'static> Summarizer<D> {
    pub fn new(engine: Arc<CompletionEngine>, store: Arc<FallbackSessionStore<D>>) -> Self {
        Self {
            engine,
            store,
            tasks: TaskTracker::new(),
        }
    }

    /// Schedule a summary for a closed session. Returns `false` (and does
    /// nothing) for an empty snapshot.
    pub fn spawn(&self, session_id: SessionId, snapshot: Vec<Message>) -> bool {
        if snapshot.is_empty() {
            debug!(session_id = %session_id, "empty conversation, no summary");
            return false;
        }
        let engine = Arc::clone(&self.engine);
        let store = Arc::clone(&self.store);
        self.tasks.spawn(async move {
            summarize_and_store(&engine, &store, &session_id, &snapshot).await;
        });
        true
    }

    /// Number of summaries still running.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Stop accepting new work and wait for running summaries, up to `timeout`.
    /// Returns `true` if everything finished in time.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tasks.close();
        let finished = tokio::time::timeout(timeout, self.tasks.wait()).await.is_ok();
        if !finished {
            warn!(pending = self.tasks.len(), "summaries still running at shutdown");
        }
        finished
    }
}

async fn summarize_and_store<D: SessionStore>(
    engine: &CompletionEngine,
    store: &FallbackSessionStore<D>,
    session_id: &SessionId,
    snapshot: &[Message],
) {
    let summary = match summarize(engine, session_id, snapshot).await {
        Ok(summary) => summary,
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "summary discarded");
            return;
        }
    };

    let duration = store
        .get_session(session_id)
        .await
        .and_then(|record| record.ended_at.map(|ended| duration_seconds(record.started_at, ended)));

    let update = SessionUpdate {
        ended_at: None,
        duration_seconds: duration,
        summary: Some(summary),
    };
    if store.update_session(session_id, &update).await.is_some() {
        info!(session_id = %session_id, "session summary stored");
    }
}

/// Run the condensed prompt through the engine with tools disabled.
#[tracing::instrument(
    name = "summarize_session",
    skip(engine, session_id, snapshot),
    fields(session_id = %session_id, message_count = snapshot.len())
)]
pub async fn summarize(
    engine: &CompletionEngine,
    session_id: &SessionId,
    snapshot: &[Message],
) -> Result<String, SummaryError> {
    let prompt = build_summary_prompt(snapshot);
    let mut fragments = engine.generate(&[Message::user(prompt)], false);

    let mut summary = String::new();
    while let Some(fragment) = fragments.next().await {
        match fragment {
            Fragment::Text(delta) => summary.push_str(&delta),
            Fragment::ToolNotice { .. } => {}
            Fragment::Error(message) => return Err(SummaryError::Backend(message)),
        }
    }

    let summary = summary.trim();
    if summary.is_empty() {
        return Err(SummaryError::Empty);
    }
    Ok(summary.to_string())
}

/// Role-tagged transcript of the last few messages, each truncated.
pub fn build_summary_prompt(messages: &[Message]) -> String {
    let start = messages.len().saturating_sub(MAX_MESSAGES);
    let transcript = messages[start..]
        .iter()
        .map(|m| {
            let content: String = m.content.chars().take(MAX_CONTENT_CHARS).collect();
            format!("{}: {}", m.role.tag(), content)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("Provide a brief (2-3 sentences) summary of this conversation:\n\n{transcript}\n\nSummary:")
}
