//! Completion backend abstraction.
//!
//! Concrete backends live in relay-infra (e.g., `OpenAiCompatibleProvider`).

pub mod provider;
