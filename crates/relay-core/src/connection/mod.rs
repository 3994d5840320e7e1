//! Live transport handles keyed by session id.
//!
//! - `Transport`: RPITIT trait a concrete socket adapter implements
//! - `ConnectionRegistry`: the only component that touches transports

pub mod registry;
pub mod transport;

pub use registry::{ConnectionId, ConnectionRegistry};
pub use transport::{Transport, TransportDyn};
