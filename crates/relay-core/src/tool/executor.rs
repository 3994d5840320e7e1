//! ToolExecutor trait and its type-erased wrapper.
//!
//! Same blanket-impl pattern as the other boxed capabilities in this crate:
//! an object-safe `ToolExecutorDyn` with boxed futures, implemented for every
//! `T: ToolExecutor`, wrapped by the cloneable `BoxToolExecutor`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use relay_types::error::ToolError;
use relay_types::tool::ToolDefinition;

/// A capability that resolves named tool calls to JSON results.
///
/// `execute` receives an already-decoded arguments object. Unknown names are
/// expected to return an `{"error": ...}` payload rather than an `Err`;
/// `Err` is reserved for a tool that was found but failed.
pub trait ToolExecutor: Send + Sync {
    /// Schema for every tool this executor can run.
    fn definitions(&self) -> Vec<ToolDefinition>;

    fn execute(
        &self,
        name: &str,
        arguments: &Value,
    ) -> impl Future<Output = Result<Value, ToolError>> + Send;
}

/// Object-safe version of [`ToolExecutor`].
pub trait ToolExecutorDyn: Send + Sync {
    fn definitions(&self) -> Vec<ToolDefinition>;

    fn execute_boxed<'a>(
        &'a self,
        name: &'a str,
        arguments: &'a Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send + 'a>>;
}

impl<T: ToolExecutor> ToolExecutorDyn for T {
    fn definitions(&self) -> Vec<ToolDefinition> {
        ToolExecutor::definitions(self)
    }

    fn execute_boxed<'a>(
        &'a self,
        name: &'a str,
        arguments: &'a Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send + 'a>> {
        Box::pin(self.execute(name, arguments))
    }
}

/// Type-erased, cheaply cloneable tool executor.
#[derive(Clone)]
pub struct BoxToolExecutor {
    inner: Arc<dyn ToolExecutorDyn>,
}

impl BoxToolExecutor {
    pub fn new<T: ToolExecutor + 'static>(executor: T) -> Self {
        Self {
            inner: Arc::new(executor),
        }
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.inner.definitions()
    }

    pub async fn execute(&self, name: &str, arguments: &Value) -> Result<Value, ToolError> {
        self.inner.execute_boxed(name, arguments).await
    }
}

impl std::fmt::Debug for BoxToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.definitions().into_iter().map(|d| d.name).collect();
        f.debug_struct("BoxToolExecutor").field("tools", &names).finish()
    }
}
