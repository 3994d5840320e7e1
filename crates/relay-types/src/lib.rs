//! Shared domain types for the relay.
//!
//! Sessions, conversation messages, completion requests and stream events,
//! tool schemas, transport frames, configuration, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod llm;
pub mod message;
pub mod protocol;
pub mod session;
pub mod tool;
