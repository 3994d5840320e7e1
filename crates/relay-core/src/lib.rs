//! Session core for the relay.
//!
//! This crate defines the persistence port (trait plus in-memory variant and
//! fallback decorator), the conversation store, the connection registry, the
//! completion engine, and the per-session lifecycle coordinator. It builds on
//! `relay-types` for the domain types and `relay-observe` for span attribute
//! names, and never on `relay-infra` or any database/IO crate.

pub mod connection;
pub mod conversation;
pub mod engine;
pub mod llm;
pub mod session;
pub mod store;
pub mod tool;

#[cfg(test)]
pub(crate) mod test_support;
