//! ConversationStore: session id -> ordered message history.
//!
//! Backed by a sharded map, so operations on different session ids never
//! contend. A single session is written by its own task only.

use dashmap::DashMap;
use tracing::debug;

use relay_types::message::{Message, Role};
use relay_types::session::SessionId;

#[derive(Debug, Default)]
struct Conversation {
    user_id: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: DashMap<SessionId, Conversation>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty conversation. No-op if one already exists.
    ///
    /// Returns `true` if a new entry was created.
    pub fn create(&self, session_id: &SessionId, user_id: Option<&str>) -> bool {
        let mut created = false;
        self.conversations
            .entry(session_id.clone())
            .or_insert_with(|| {
                created = true;
                Conversation {
                    user_id: user_id.map(str::to_string),
                    messages: Vec::new(),
                }
            });
        if created {
            debug!(session_id = %session_id, "conversation created");
        }
        created
    }

    /// Append a message, creating the conversation if needed.
    pub fn append(&self, session_id: &SessionId, role: Role, content: impl Into<String>) -> Message {
        let message = Message::new(role, content);
        self.conversations
            .entry(session_id.clone())
            .or_default()
            .messages
            .push(message.clone());
        message
    }

    /// Ordered history. Empty for an unknown id.
    pub fn get(&self, session_id: &SessionId) -> Vec<Message> {
        self.conversations
            .get(session_id)
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }

    /// The user id recorded at creation, if any.
    pub fn user_id(&self, session_id: &SessionId) -> Option<String> {
        self.conversations
            .get(session_id)
            .and_then(|c| c.user_id.clone())
    }

    /// Atomically remove the conversation and return its full history.
    pub fn close(&self, session_id: &SessionId) -> Vec<Message> {
        self.conversations
            .remove(session_id)
            .map(|(_, c)| c.messages)
            .unwrap_or_default()
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.conversations.contains_key(session_id)
    }

    /// Number of live conversations.
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}
