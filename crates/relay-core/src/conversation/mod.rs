//! Per-session ordered conversation history.

pub mod store;

pub use store::ConversationStore;
