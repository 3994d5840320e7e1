//! LlmProvider trait definition.

use std::pin::Pin;

use futures_util::Stream;

use relay_types::llm::{CompletionRequest, LlmError, StreamEvent};

/// Boxed stream of backend events, terminated by [`StreamEvent::Done`] or an error.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;

/// Trait for streaming completion backends.
///
/// The stream is boxed and `'static` so a provider can be shared as
/// `Arc<dyn LlmProvider>` and a run can outlive the borrow that started it.
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a streaming completion request. Returns a stream of events.
    ///
    /// Text and tool-call fragments arrive as distinct event variants.
    fn stream(&self, request: CompletionRequest) -> EventStream;
}
