//! LLM provider implementations.
//!
//! Concrete implementations of the [`LlmProvider`] trait defined in
//! `relay-core`.
//!
//! [`LlmProvider`]: relay_core::llm::provider::LlmProvider

pub mod openai_compat;

pub use openai_compat::OpenAiCompatibleProvider;
