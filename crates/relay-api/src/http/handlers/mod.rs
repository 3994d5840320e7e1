//! HTTP and WebSocket handlers.

pub mod health;
pub mod session;
pub mod ws;
