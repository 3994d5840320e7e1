//! Observability for the relay: subscriber setup and span attribute names.

pub mod genai_attrs;
pub mod tracing_setup;

pub use tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};
