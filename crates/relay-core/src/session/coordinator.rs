//! SessionCoordinator: drives one session from connect to close.
//!
//! A session task moves through `Connecting -> Active -> Closing -> Closed`.
//! While active it handles one inbound frame at a time: append the user
//! message, stream a completion to the client, append the assembled reply,
//! and log both through the persistence port. Closing snapshots the
//! conversation, records the closure, and hands the snapshot to the
//! summarizer without waiting for it.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use relay_types::config::SessionConfig;
use relay_types::message::Role;
use relay_types::protocol::{InboundFrame, OutboundFrame, TOOL_NOTICE_TEXT};
use relay_types::session::{EventKind, SessionId, SessionState, SessionUpdate, duration_seconds};

use crate::connection::{ConnectionId, ConnectionRegistry, Transport};
use crate::conversation::ConversationStore;
use crate::engine::{CompletionEngine, Fragment};
use crate::store::{FallbackSessionStore, SessionStore};

use super::summarizer::Summarizer;

/// Lifecycle phase of one session task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    Active,
    Closing,
    Closed,
}

/// Why a session task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The client went away (socket closed or inbound stream ended).
    Disconnected,
    /// A write to the client failed, or a newer connection took over.
    TransportLost,
    /// No inbound frame within the idle timeout.
    IdleTimeout,
    /// The session id belongs to a session that is already closed.
    Rejected,
    /// The task panicked; treated as a disconnect.
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TurnOutcome {
    Completed,
    Failed,
    TransportLost,
}

enum Inbound {
    Frame(String),
    Closed,
    Idle,
}

#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    pub idle_timeout: Option<Duration>,
}

impl From<&SessionConfig> for SessionSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            idle_timeout: (config.idle_timeout_secs > 0)
                .then(|| Duration::from_secs(config.idle_timeout_secs)),
        }
    }
}

/// Long-lived owner of the shared session structures.
///
/// Shared by reference (usually behind an `Arc`) with every session task.
pub struct SessionCoordinator<D> {
    registry: Arc<ConnectionRegistry>,
    conversations: Arc<ConversationStore>,
    store: Arc<FallbackSessionStore<D>>,
    engine: Arc<CompletionEngine>,
    summarizer: Summarizer<D>,
    settings: SessionSettings,
}

impl<D: SessionStore + 'static> SessionCoordinator<D> {
    pub fn new(store: FallbackSessionStore<D>, engine: CompletionEngine, settings: SessionSettings) -> Self {
        let store = Arc::new(store);
        let engine = Arc::new(engine);
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
            conversations: Arc::new(ConversationStore::new()),
            summarizer: Summarizer::new(Arc::clone(&engine), Arc::clone(&store)),
            store,
            engine,
            settings,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn store(&self) -> &FallbackSessionStore<D> {
        &self.store
    }

    pub fn summarizer(&self) -> &Summarizer<D> {
        &self.summarizer
    }

    /// Run one session until the client leaves.
    ///
    /// `inbound` yields raw text frames in arrival order; frames that arrive
    /// while a turn is streaming wait in the channel. Cancelling
    /// `disconnected` ends the task at its current await, discarding any
    /// reply still being streamed.
    pub async fn run_session<T: Transport + 'static>(
        &self,
        session_id: SessionId,
        user_id: Option<String>,
        transport: T,
        inbound: mpsc::Receiver<String>,
        disconnected: CancellationToken,
    ) -> CloseReason {
        let mut phase = SessionPhase::Connecting;
        debug!(session_id = %session_id, ?phase, "session phase");

        let record = self
            .store
            .create_session(&session_id, user_id.as_deref())
            .await;
        if record.state == SessionState::Closed {
            warn!(session_id = %session_id, "connect to closed session rejected");
            self.registry
                .reject(transport, &OutboundFrame::error(format!("session {session_id} is closed")))
                .await;
            return CloseReason::Rejected;
        }

        self.conversations.create(&session_id, record.user_id.as_deref());
        let connection_id = self.registry.connect(&session_id, transport).await;
        self.registry
            .send_as(&session_id, connection_id, &OutboundFrame::welcome(&session_id))
            .await;
        phase = advance(&session_id, phase, SessionPhase::Active);

        let served = AssertUnwindSafe(self.serve(&session_id, connection_id, inbound, &disconnected))
            .catch_unwind()
            .await;
        let reason = match served {
            Ok(reason) => reason,
            Err(_) => {
                error!(session_id = %session_id, "session task panicked, closing");
                CloseReason::Aborted
            }
        };

        phase = advance(&session_id, phase, SessionPhase::Closing);
        if self.close(&session_id, connection_id).await {
            advance(&session_id, phase, SessionPhase::Closed);
        }
        info!(session_id = %session_id, ?reason, "session ended");
        reason
    }

    async fn serve(
        &self,
        session_id: &SessionId,
        connection_id: ConnectionId,
        mut inbound: mpsc::Receiver<String>,
        disconnected: &CancellationToken,
    ) -> CloseReason {
        loop {
            let next = tokio::select! {
                biased;
                _ = disconnected.cancelled() => return CloseReason::Disconnected,
                next = next_inbound(&mut inbound, self.settings.idle_timeout) => next,
            };

            let raw = match next {
                Inbound::Frame(raw) => raw,
                Inbound::Closed => return CloseReason::Disconnected,
                Inbound::Idle => {
                    info!(session_id = %session_id, "session idle, closing");
                    self.registry
                        .send_as(session_id, connection_id, &OutboundFrame::error("Session timed out"))
                        .await;
                    return CloseReason::IdleTimeout;
                }
            };

            if !self.registry.is_current(session_id, connection_id) {
                return CloseReason::TransportLost;
            }

            let frame = match InboundFrame::parse(&raw) {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(session_id = %session_id, raw = %raw, error = %err, "Ignoring malformed inbound frame");
                    continue;
                }
            };

            let outcome = tokio::select! {
                biased;
                _ = disconnected.cancelled() => {
                    info!(session_id = %session_id, "disconnected mid-turn, reply discarded");
                    return CloseReason::Disconnected;
                }
                outcome = self.run_turn(session_id, connection_id, frame.content) => outcome,
            };
            if outcome == TurnOutcome::TransportLost {
                return CloseReason::TransportLost;
            }
        }
    }

    /// One user-message-in, assistant-message-out cycle.
    ///
    /// Every frame goes out as `connection_id`. Once a newer connection takes
    /// over, the turn stops without touching the conversation again.
    async fn run_turn(
        &self,
        session_id: &SessionId,
        connection_id: ConnectionId,
        content: String,
    ) -> TurnOutcome {
        self.conversations.append(session_id, Role::User, content.clone());
        self.store
            .log_event(session_id, EventKind::UserMessage, &content)
            .await;

        let history = self.conversations.get(session_id);
        if !self.registry.send_as(session_id, connection_id, &OutboundFrame::AiResponseStart).await {
            return TurnOutcome::TransportLost;
        }

        let mut fragments = self.engine.generate(&history, true);
        let mut reply = String::new();
        while let Some(fragment) = fragments.next().await {
            let delivered = match fragment {
                Fragment::Text(delta) => {
                    reply.push_str(&delta);
                    self.registry.send_as(session_id, connection_id, &OutboundFrame::chunk(delta)).await
                }
                Fragment::ToolNotice { tools } => {
                    reply.push_str(TOOL_NOTICE_TEXT);
                    self.store
                        .log_event(
                            session_id,
                            EventKind::ToolCall,
                            &format!("[tool call] {}", tools.join(", ")),
                        )
                        .await;
                    self.registry
                        .send_as(session_id, connection_id, &OutboundFrame::chunk(TOOL_NOTICE_TEXT))
                        .await
                }
                Fragment::Error(message) => {
                    warn!(session_id = %session_id, error = %message, "turn failed");
                    self.registry
                        .send_as(session_id, connection_id, &OutboundFrame::error(message))
                        .await;
                    return TurnOutcome::Failed;
                }
            };
            if !delivered {
                return TurnOutcome::TransportLost;
            }
            tokio::task::yield_now().await;
        }

        if !self.registry.is_current(session_id, connection_id) {
            info!(session_id = %session_id, "superseded mid-turn, reply discarded");
            return TurnOutcome::TransportLost;
        }
        self.conversations
            .append(session_id, Role::Assistant, reply.clone());
        self.store
            .log_event(session_id, EventKind::AiResponse, &reply)
            .await;

        if !self.registry.send_as(session_id, connection_id, &OutboundFrame::AiResponseEnd).await {
            return TurnOutcome::TransportLost;
        }
        debug!(session_id = %session_id, chars = reply.len(), "turn completed");
        TurnOutcome::Completed
    }

    /// Tear down shared state for a session. Returns `false` if a newer
    /// connection owns the session, in which case nothing is torn down.
    async fn close(&self, session_id: &SessionId, connection_id: ConnectionId) -> bool {
        if !self.registry.release(session_id, connection_id).await
            && self.registry.is_connected(session_id)
        {
            info!(session_id = %session_id, "superseded by a newer connection, session stays open");
            return false;
        }

        let snapshot = self.conversations.close(session_id);
        let ended_at = Utc::now();
        let duration = self
            .store
            .get_session(session_id)
            .await
            .map(|record| duration_seconds(record.started_at, ended_at));

        self.store
            .update_session(
                session_id,
                &SessionUpdate {
                    ended_at: Some(ended_at),
                    duration_seconds: duration,
                    summary: None,
                },
            )
            .await;
        self.store
            .log_event(
                session_id,
                EventKind::System,
                &format!("Session closed with {} messages", snapshot.len()),
            )
            .await;

        self.summarizer.spawn(session_id.clone(), snapshot);
        true
    }
}

fn advance(session_id: &SessionId, from: SessionPhase, to: SessionPhase) -> SessionPhase {
    debug!(session_id = %session_id, ?from, ?to, "session phase");
    to
}

async fn next_inbound(inbound: &mut mpsc::Receiver<String>, idle: Option<Duration>) -> Inbound {
    let received = match idle {
        Some(limit) => match tokio::time::timeout(limit, inbound.recv()).await {
            Ok(received) => received,
            Err(_) => return Inbound::Idle,
        },
        None => inbound.recv().await,
    };
    match received {
        Some(raw) => Inbound::Frame(raw),
        None => Inbound::Closed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineSettings;
    use crate::store::MemorySessionStore;
    use crate::test_support::{
        FailingStore, ReadOnlyStore, RecordingTransport, ScriptedProvider, Step, text_script,
        tool_call_steps, tool_stop,
    };
    use crate::tool::builtin::BuiltinTools;
    use crate::tool::executor::BoxToolExecutor;
    use relay_types::config::LlmConfig;
    use relay_types::llm::StreamEvent;
    use relay_types::message::Message;
    use tokio::task::JoinHandle;

    struct Harness<D> {
        coordinator: Arc<SessionCoordinator<D>>,
        provider: Arc<ScriptedProvider>,
        transport: RecordingTransport,
        inbound: mpsc::Sender<String>,
        disconnected: CancellationToken,
        task: JoinHandle<CloseReason>,
        id: SessionId,
    }

    fn coordinator<D: SessionStore + 'static>(
        store: FallbackSessionStore<D>,
        provider: Arc<ScriptedProvider>,
        settings: SessionSettings,
    ) -> Arc<SessionCoordinator<D>> {
        let engine = CompletionEngine::new(
            provider,
            BoxToolExecutor::new(BuiltinTools),
            EngineSettings::from(&LlmConfig::default()),
        );
        Arc::new(SessionCoordinator::new(store, engine, settings))
    }

    fn start<D: SessionStore + 'static>(
        store: FallbackSessionStore<D>,
        scripts: Vec<Vec<Step>>,
        settings: SessionSettings,
    ) -> Harness<D> {
        let provider = Arc::new(ScriptedProvider::new(scripts));
        let coordinator = coordinator(store, Arc::clone(&provider), settings);
        let transport = RecordingTransport::new();
        let (tx, rx) = mpsc::channel(8);
        let disconnected = CancellationToken::new();
        let id = SessionId::from("s1");

        let task = {
            let coordinator = Arc::clone(&coordinator);
            let transport = transport.clone();
            let disconnected = disconnected.clone();
            let id = id.clone();
            tokio::spawn(async move {
                coordinator
                    .run_session(id, Some("u1".to_string()), transport, rx, disconnected)
                    .await
            })
        };

        Harness {
            coordinator,
            provider,
            transport,
            inbound: tx,
            disconnected,
            task,
            id,
        }
    }

    fn in_memory() -> FallbackSessionStore<MemorySessionStore> {
        FallbackSessionStore::in_memory()
    }

    fn say(content: &str) -> String {
        serde_json::json!({ "content": content }).to_string()
    }

    #[tokio::test]
    async fn test_single_turn_streams_and_records() {
        let h = start(in_memory(), vec![text_script(&["Hello", " there!"])], SessionSettings::default());

        h.inbound.send(say("hi")).await.unwrap();
        h.transport.wait_for_frames(5).await;

        let history = h.coordinator.conversations().get(&h.id);
        let recorded: Vec<(Role, &str)> = history.iter().map(|m| (m.role, m.content.as_str())).collect();
        assert_eq!(recorded, vec![(Role::User, "hi"), (Role::Assistant, "Hello there!")]);

        let frames = h.transport.json_frames();
        let types: Vec<&str> = frames.iter().map(|f| f["type"].as_str().unwrap()).collect();
        assert_eq!(
            types,
            vec!["system", "ai_response_start", "ai_response_chunk", "ai_response_chunk", "ai_response_end"]
        );
        assert_eq!(frames[0]["content"], "Connected to session s1");
        assert_eq!(frames[2]["content"], "Hello");
        assert_eq!(frames[3]["content"], " there!");
        assert_eq!(h.coordinator.registry().count(), 1);

        drop(h.inbound);
        assert_eq!(h.task.await.unwrap(), CloseReason::Disconnected);
        assert_eq!(h.coordinator.registry().count(), 0);
        assert!(h.coordinator.conversations().get(&h.id).is_empty());

        let events = h.coordinator.store().get_history(&h.id).await;
        let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::UserMessage, EventKind::AiResponse, EventKind::System]);
        assert_eq!(events[2].content, "Session closed with 2 messages");

        let record = h.coordinator.store().get_session(&h.id).await.unwrap();
        assert_eq!(record.state, SessionState::Closed);
        assert_eq!(record.user_id.as_deref(), Some("u1"));
        assert!(record.duration_seconds.is_some());
    }

    #[tokio::test]
    async fn test_tool_turn_records_notice_and_single_tool_round() {
        let mut first = tool_call_steps(0, "call_1", "get_system_metrics", &["{\"metric_type\":", "\"cpu\"}"]);
        first.push(tool_stop());
        let mut second = vec![Step::Event(StreamEvent::TextDelta {
            text: "CPU is at 42.5%.".to_string(),
        })];
        second.extend(tool_call_steps(0, "call_2", "get_system_metrics", &["{}"]));
        second.push(tool_stop());

        let h = start(in_memory(), vec![first, second], SessionSettings::default());
        h.inbound.send(say("how busy is the cpu?")).await.unwrap();
        h.transport.wait_for_frames(5).await;

        let frames = h.transport.json_frames();
        assert_eq!(frames[2]["content"], TOOL_NOTICE_TEXT);
        assert_eq!(frames[3]["content"], "CPU is at 42.5%.");
        assert_eq!(frames[4]["type"], "ai_response_end");
        assert_eq!(h.provider.call_count(), 2);

        let history = h.coordinator.conversations().get(&h.id);
        let roles: Vec<Role> = history.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(history[1].content, format!("{TOOL_NOTICE_TEXT}CPU is at 42.5%."));

        let events = h.coordinator.store().get_history(&h.id).await;
        let tool_events: Vec<&str> = events
            .iter()
            .filter(|e| e.kind == EventKind::ToolCall)
            .map(|e| e.content.as_str())
            .collect();
        assert_eq!(tool_events, vec!["[tool call] get_system_metrics"]);

        let followup = &h.provider.requests()[1];
        assert_eq!(followup.messages.iter().filter(|m| m.role == Role::Tool).count(), 1);
        h.disconnected.cancel();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_backend_error_sends_error_frame_and_records_only_user() {
        let h = start(
            in_memory(),
            vec![vec![Step::Fail("model overloaded".to_string())]],
            SessionSettings::default(),
        );

        h.inbound.send(say("hi")).await.unwrap();
        h.transport.wait_for_frames(3).await;

        let frames = h.transport.json_frames();
        assert_eq!(frames[2]["type"], "error");
        assert!(frames[2]["content"].as_str().unwrap().starts_with("Error: "));
        assert!(frames[2]["content"].as_str().unwrap().contains("model overloaded"));

        let roles: Vec<Role> = h
            .coordinator
            .conversations()
            .get(&h.id)
            .iter()
            .map(|m| m.role)
            .collect();
        assert_eq!(roles, vec![Role::User]);

        // The session survives a failed turn.
        assert!(h.coordinator.registry().is_connected(&h.id));
        h.disconnected.cancel();
        assert_eq!(h.task.await.unwrap(), CloseReason::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_mid_stream_discards_partial_reply() {
        let stalled = vec![
            Step::Event(StreamEvent::TextDelta { text: "one ".to_string() }),
            Step::Event(StreamEvent::TextDelta { text: "two ".to_string() }),
            Step::Hold,
        ];
        let h = start(
            in_memory(),
            vec![
                text_script(&["Hello", " there!"]),
                stalled,
                text_script(&["A short summary."]),
            ],
            SessionSettings::default(),
        );

        h.inbound.send(say("hi")).await.unwrap();
        h.transport.wait_for_frames(5).await;
        h.inbound.send(say("tell me five things")).await.unwrap();
        // start + 2 of the 5 expected chunks
        h.transport.wait_for_frames(8).await;

        h.disconnected.cancel();
        assert_eq!(h.task.await.unwrap(), CloseReason::Disconnected);
        assert!(h.coordinator.summarizer().drain(Duration::from_secs(5)).await);

        let events = h.coordinator.store().get_history(&h.id).await;
        let responses: Vec<&str> = events
            .iter()
            .filter(|e| e.kind == EventKind::AiResponse)
            .map(|e| e.content.as_str())
            .collect();
        assert_eq!(responses, vec!["Hello there!"]);
        assert_eq!(events.last().unwrap().content, "Session closed with 3 messages");

        let summary_request = &h.provider.requests()[2];
        let prompt = &summary_request.messages[0].content;
        assert!(prompt.contains("USER: hi\nASSISTANT: Hello there!\nUSER: tell me five things"));
        assert!(!prompt.contains("one two"));
        assert!(summary_request.tools.is_none());

        let record = h.coordinator.store().get_session(&h.id).await.unwrap();
        assert_eq!(record.summary.as_deref(), Some("A short summary."));
        assert_eq!(record.state, SessionState::Closed);
    }

    #[tokio::test]
    async fn test_superseded_turn_stops_streaming_and_recording() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let old_reply = vec![
            Step::Event(StreamEvent::TextDelta { text: "old-1".to_string() }),
            Step::Gate(Arc::clone(&gate)),
            Step::Event(StreamEvent::TextDelta { text: "old-2".to_string() }),
            Step::Event(StreamEvent::TextDelta { text: "old-3".to_string() }),
        ];
        let h = start(in_memory(), vec![old_reply], SessionSettings::default());

        h.inbound.send(say("hi")).await.unwrap();
        // welcome + start + "old-1"
        h.transport.wait_for_frames(3).await;

        let newer = RecordingTransport::new();
        let (newer_tx, newer_rx) = mpsc::channel(4);
        let newer_task = {
            let coordinator = Arc::clone(&h.coordinator);
            let newer = newer.clone();
            let id = h.id.clone();
            tokio::spawn(async move {
                coordinator
                    .run_session(id, None, newer, newer_rx, CancellationToken::new())
                    .await
            })
        };
        newer.wait_for_frames(1).await;

        gate.notify_one();
        assert_eq!(h.task.await.unwrap(), CloseReason::TransportLost);

        let frames = newer.json_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "system");

        let history = h.coordinator.conversations().get(&h.id);
        let recorded: Vec<(Role, &str)> = history.iter().map(|m| (m.role, m.content.as_str())).collect();
        assert_eq!(recorded, vec![(Role::User, "hi")]);
        let events = h.coordinator.store().get_history(&h.id).await;
        assert!(events.iter().all(|e| e.kind != EventKind::AiResponse));

        // The superseded task leaves the session open for the newer connection.
        assert!(h.coordinator.registry().is_connected(&h.id));
        let record = h.coordinator.store().get_session(&h.id).await.unwrap();
        assert_eq!(record.state, SessionState::Active);

        drop(newer_tx);
        assert_eq!(newer_task.await.unwrap(), CloseReason::Disconnected);
    }

    #[tokio::test]
    async fn test_closed_session_cannot_be_reopened() {
        let h = start(in_memory(), vec![], SessionSettings::default());
        h.transport.wait_for_frames(1).await;
        drop(h.inbound);
        h.task.await.unwrap();

        let transport = RecordingTransport::new();
        let (_tx, rx) = mpsc::channel(1);
        let reason = h
            .coordinator
            .run_session(h.id.clone(), None, transport.clone(), rx, CancellationToken::new())
            .await;

        assert_eq!(reason, CloseReason::Rejected);
        assert!(transport.is_closed());
        let frames = transport.json_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "error");
        assert_eq!(h.coordinator.registry().count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_frame_is_ignored() {
        let h = start(in_memory(), vec![text_script(&["ok"])], SessionSettings::default());

        h.inbound.send("not json".to_string()).await.unwrap();
        h.inbound.send(r#"{"text":"wrong field"}"#.to_string()).await.unwrap();
        h.inbound.send(say("real")).await.unwrap();
        h.transport.wait_for_frames(4).await;

        let history = h.coordinator.conversations().get(&h.id);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], Message { created_at: history[0].created_at, ..Message::user("real") });
        h.disconnected.cancel();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_idle_timeout_closes_session() {
        let settings = SessionSettings {
            idle_timeout: Some(Duration::from_millis(50)),
        };
        let h = start(in_memory(), vec![], settings);

        assert_eq!(h.task.await.unwrap(), CloseReason::IdleTimeout);
        let frames = h.transport.json_frames();
        assert_eq!(frames.last().unwrap()["content"], "Error: Session timed out");
        assert_eq!(h.coordinator.registry().count(), 0);
    }

    #[tokio::test]
    async fn test_storage_outage_does_not_interrupt_session() {
        let h = start(
            FallbackSessionStore::new(FailingStore),
            vec![text_script(&["still here"])],
            SessionSettings::default(),
        );

        h.inbound.send(say("hi")).await.unwrap();
        h.transport.wait_for_frames(4).await;
        drop(h.inbound);
        assert_eq!(h.task.await.unwrap(), CloseReason::Disconnected);

        let record = h.coordinator.store().get_session(&h.id).await.unwrap();
        assert_eq!(record.state, SessionState::Closed);
        let events = h.coordinator.store().get_history(&h.id).await;
        assert_eq!(events.len(), 3);
    }

    #[tokio::test]
    async fn test_read_only_durable_store_still_records_close() {
        let h = start(
            FallbackSessionStore::new(ReadOnlyStore::default()),
            vec![text_script(&["noted"])],
            SessionSettings::default(),
        );

        h.inbound.send(say("hi")).await.unwrap();
        h.transport.wait_for_frames(4).await;
        drop(h.inbound);
        assert_eq!(h.task.await.unwrap(), CloseReason::Disconnected);

        let record = h.coordinator.store().get_session(&h.id).await.unwrap();
        assert_eq!(record.state, SessionState::Closed);
        assert!(record.duration_seconds.is_some());
        let kinds: Vec<EventKind> = h
            .coordinator
            .store()
            .get_history(&h.id)
            .await
            .iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(kinds, vec![EventKind::UserMessage, EventKind::AiResponse, EventKind::System]);
    }

    #[tokio::test]
    async fn test_sessions_run_concurrently() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            text_script(&["to a"]),
            text_script(&["to b"]),
        ]));
        let coordinator = coordinator(in_memory(), provider, SessionSettings::default());

        let mut tasks = Vec::new();
        let mut channels = Vec::new();
        for name in ["a", "b"] {
            let transport = RecordingTransport::new();
            let (tx, rx) = mpsc::channel(4);
            let coordinator = Arc::clone(&coordinator);
            let t = transport.clone();
            tasks.push(tokio::spawn(async move {
                coordinator
                    .run_session(SessionId::from(name), None, t, rx, CancellationToken::new())
                    .await
            }));
            channels.push((SessionId::from(name), tx, transport));
        }

        for (_, tx, transport) in &channels {
            tx.send(say("hi")).await.unwrap();
            transport.wait_for_frames(4).await;
        }
        assert_eq!(coordinator.registry().count(), 2);
        for (id, _, _) in &channels {
            let history = coordinator.conversations().get(id);
            assert_eq!(history.len(), 2);
            assert_eq!(history[0].content, "hi");
        }

        drop(channels);
        for task in tasks {
            assert_eq!(task.await.unwrap(), CloseReason::Disconnected);
        }
        assert_eq!(coordinator.registry().count(), 0);
    }
}
