//! Persistence port.
//!
//! - `SessionStore`: RPITIT trait implemented by the durable store (relay-infra)
//!   and by [`MemorySessionStore`]
//! - `FallbackSessionStore`: decorator that serves any failed durable call
//!   from the in-memory variant

pub mod fallback;
pub mod memory;
pub mod repository;

pub use fallback::FallbackSessionStore;
pub use memory::MemorySessionStore;
pub use repository::SessionStore;
