//! Transport trait definition.

use std::future::Future;
use std::pin::Pin;

use relay_types::error::TransportError;

/// A framed, text-only outbound channel to one client.
///
/// Implementations live at the edge (e.g., the WebSocket adapter in relay-api).
pub trait Transport: Send + Sync {
    /// Write one UTF-8 text frame.
    fn send_text(&self, payload: String) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Best-effort close. Errors are ignored by callers.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Object-safe version of [`Transport`] with boxed futures.
///
/// A blanket implementation is provided for all types implementing `Transport`.
pub trait TransportDyn: Send + Sync {
    fn send_text_boxed(
        &self,
        payload: String,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>>;

    fn close_boxed(&self) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>>;
}

impl<T: Transport> TransportDyn for T {
    fn send_text_boxed(
        &self,
        payload: String,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>> {
        Box::pin(self.send_text(payload))
    }

    fn close_boxed(&self) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>> {
        Box::pin(self.close())
    }
}
