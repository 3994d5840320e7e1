//! Session lifecycle: one task per connection, plus background summaries.

pub mod coordinator;
pub mod summarizer;

pub use coordinator::{CloseReason, SessionCoordinator, SessionPhase, SessionSettings};
pub use summarizer::{SummaryError, Summarizer};
