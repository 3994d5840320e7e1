//! Infrastructure layer for the relay.
//!
//! Implementations of the traits defined in `relay-core`: the SQLite
//! session store and the OpenAI-compatible streaming backend. Also loads
//! the TOML configuration file.

pub mod config;
pub mod llm;
pub mod sqlite;
