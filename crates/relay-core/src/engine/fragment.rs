//! Output units of a completion run.

use std::pin::Pin;

use futures_util::Stream;

/// One incremental unit of generated output.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// A delta of assistant text.
    Text(String),
    /// The backend requested tools; they are about to run. Carries the
    /// requested tool names in arrival order.
    ToolNotice { tools: Vec<String> },
    /// The run failed and has ended.
    Error(String),
}

/// Lazily produced, non-restartable sequence of fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Fragment> + Send + 'static>>;
