//! HTTP/WebSocket layer for the relay.
//!
//! Axum router with the session WebSocket at `/ws/session/{id}`, a health
//! probe, and a read-only session inspection endpoint.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod transport;
