//! Tool execution capability.
//!
//! - `ToolExecutor`: RPITIT trait the completion engine is handed
//! - `BoxToolExecutor`: object-safe wrapper for dynamic dispatch
//! - `BuiltinTools`: the relay's own profile and metrics tools

pub mod builtin;
pub mod executor;
