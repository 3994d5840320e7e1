//! Shared mocks for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use relay_types::error::{RepositoryError, TransportError};
use relay_types::llm::{CompletionRequest, LlmError, StopReason, StreamEvent, Usage};
use relay_types::session::{EventKind, EventRecord, SessionId, SessionRecord, SessionUpdate};

use crate::connection::Transport;
use crate::llm::provider::{EventStream, LlmProvider};
use crate::store::{MemorySessionStore, SessionStore};

// --- Transport ---

#[derive(Default)]
struct TransportState {
    frames: Mutex<Vec<String>>,
    closed: AtomicBool,
    fail: bool,
    sent: Notify,
}

/// Transport that records every frame. Clones share state.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    state: Arc<TransportState>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write fails.
    pub fn failing() -> Self {
        Self {
            state: Arc::new(TransportState {
                fail: true,
                ..Default::default()
            }),
        }
    }

    pub fn frames(&self) -> Vec<String> {
        self.state.frames.lock().unwrap().clone()
    }

    pub fn json_frames(&self) -> Vec<serde_json::Value> {
        self.frames()
            .iter()
            .map(|f| serde_json::from_str(f).unwrap())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` frames have been written.
    pub async fn wait_for_frames(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let notified = self.state.sent.notified();
                if self.state.frames.lock().unwrap().len() >= n {
                    return;
                }
                notified.await;
            }
        })
        .await
        .expect("frames did not arrive in time");
    }
}

impl Transport for RecordingTransport {
    async fn send_text(&self, payload: String) -> Result<(), TransportError> {
        if self.state.fail || self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.state.frames.lock().unwrap().push(payload);
        self.state.sent.notify_waiters();
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.state.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// --- Session store ---

/// Durable store that is permanently down.
pub struct FailingStore;

impl SessionStore for FailingStore {
    async fn create_session(
        &self,
        _session_id: &SessionId,
        _user_id: Option<&str>,
    ) -> Result<SessionRecord, RepositoryError> {
        Err(RepositoryError::Connection)
    }

    async fn get_session(
        &self,
        _session_id: &SessionId,
    ) -> Result<Option<SessionRecord>, RepositoryError> {
        Err(RepositoryError::Connection)
    }

    async fn update_session(
        &self,
        _session_id: &SessionId,
        _update: &SessionUpdate,
    ) -> Result<SessionRecord, RepositoryError> {
        Err(RepositoryError::Query("no such table: sessions".to_string()))
    }

    async fn log_event(
        &self,
        _session_id: &SessionId,
        _kind: EventKind,
        _content: &str,
    ) -> Result<EventRecord, RepositoryError> {
        Err(RepositoryError::Connection)
    }

    async fn get_history(&self, _session_id: &SessionId) -> Result<Vec<EventRecord>, RepositoryError> {
        Err(RepositoryError::Connection)
    }

    async fn health_check(&self) -> bool {
        false
    }
}

/// Durable store whose reads work but whose writes all fail.
#[derive(Default)]
pub struct ReadOnlyStore {
    inner: MemorySessionStore,
}

impl ReadOnlyStore {
    /// Write directly to the backing rows, as if logged before the outage.
    pub async fn seed_event(&self, session_id: &SessionId, kind: EventKind, content: &str) {
        self.inner.log_event(session_id, kind, content).await.unwrap();
    }
}

fn readonly() -> RepositoryError {
    RepositoryError::Query("attempt to write a readonly database".to_string())
}

impl SessionStore for ReadOnlyStore {
    async fn create_session(
        &self,
        _session_id: &SessionId,
        _user_id: Option<&str>,
    ) -> Result<SessionRecord, RepositoryError> {
        Err(readonly())
    }

    async fn get_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<SessionRecord>, RepositoryError> {
        self.inner.get_session(session_id).await
    }

    async fn update_session(
        &self,
        session_id: &SessionId,
        _update: &SessionUpdate,
    ) -> Result<SessionRecord, RepositoryError> {
        match self.inner.get_session(session_id).await? {
            Some(_) => Err(readonly()),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn log_event(
        &self,
        _session_id: &SessionId,
        _kind: EventKind,
        _content: &str,
    ) -> Result<EventRecord, RepositoryError> {
        Err(readonly())
    }

    async fn get_history(&self, session_id: &SessionId) -> Result<Vec<EventRecord>, RepositoryError> {
        self.inner.get_history(session_id).await
    }

    async fn health_check(&self) -> bool {
        true
    }
}

// --- Provider ---

/// One step of a scripted backend response.
#[derive(Clone)]
pub enum Step {
    Event(StreamEvent),
    Fail(String),
    /// Never resolves; simulates a backend that stalls mid-stream.
    Hold,
    /// Pauses the stream until the test notifies.
    Gate(Arc<Notify>),
}

/// Backend that replays one script per `stream` call, in order.
/// Once the scripts run out every call ends immediately with `Done`.
#[derive(Default)]
pub struct ScriptedProvider {
    scripts: Mutex<VecDeque<Vec<Step>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(scripts: Vec<Vec<Step>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn stream(&self, request: CompletionRequest) -> EventStream {
        self.requests.lock().unwrap().push(request);
        let steps = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        Box::pin(async_stream::stream! {
            for step in steps {
                match step {
                    Step::Event(event) => yield Ok(event),
                    Step::Fail(message) => {
                        yield Err(LlmError::Stream(message));
                        break;
                    }
                    Step::Hold => std::future::pending::<()>().await,
                    Step::Gate(gate) => gate.notified().await,
                }
            }
            yield Ok(StreamEvent::Done);
        })
    }
}

/// Text deltas followed by an end-of-turn stop reason.
pub fn text_script(parts: &[&str]) -> Vec<Step> {
    let mut steps: Vec<Step> = parts
        .iter()
        .map(|p| Step::Event(StreamEvent::TextDelta { text: p.to_string() }))
        .collect();
    steps.push(Step::Event(StreamEvent::MessageDelta {
        stop_reason: StopReason::EndTurn,
    }));
    steps.push(Step::Event(StreamEvent::Usage(Usage {
        input_tokens: 10,
        output_tokens: parts.len() as u32,
    })));
    steps
}

/// A single tool call whose arguments arrive split across `argument_parts`.
pub fn tool_call_steps(index: u32, id: &str, name: &str, argument_parts: &[&str]) -> Vec<Step> {
    let mut steps = vec![Step::Event(StreamEvent::ToolCallDelta {
        index,
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        arguments: None,
    })];
    for part in argument_parts {
        steps.push(Step::Event(StreamEvent::ToolCallDelta {
            index,
            id: None,
            name: None,
            arguments: Some(part.to_string()),
        }));
    }
    steps
}

pub fn tool_stop() -> Step {
    Step::Event(StreamEvent::MessageDelta {
        stop_reason: StopReason::ToolUse,
    })
}
