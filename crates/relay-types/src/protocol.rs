//! Transport frames exchanged with clients.
//!
//! Inbound frames are a single JSON object `{ "content": string }`. Outbound
//! frames are tagged by `type`.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::session::SessionId;

/// Chunk content delivered to the client when the backend requests tools.
pub const TOOL_NOTICE_TEXT: &str = "\n\n[Processing tool request...]\n";

/// A message sent by the client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundFrame {
    pub content: String,
}

impl InboundFrame {
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(raw).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }
}

/// A frame sent to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    System {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
    },
    AiResponseStart,
    AiResponseChunk {
        content: String,
    },
    AiResponseEnd,
    Error {
        content: String,
    },
}

impl OutboundFrame {
    pub fn welcome(session_id: &SessionId) -> Self {
        OutboundFrame::System {
            content: format!("Connected to session {session_id}"),
            session_id: Some(session_id.clone()),
        }
    }

    pub fn chunk(content: impl Into<String>) -> Self {
        OutboundFrame::AiResponseChunk {
            content: content.into(),
        }
    }

    /// An error frame carrying a human-readable cause.
    pub fn error(cause: impl std::fmt::Display) -> Self {
        OutboundFrame::Error {
            content: format!("Error: {cause}"),
        }
    }
}
