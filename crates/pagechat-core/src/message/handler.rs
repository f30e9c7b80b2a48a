//! Message handler trait and the concrete handlers.
//!
//! Follows the same blanket-impl pattern used for other RPITIT ports:
//! 1. `MessageHandler` is the ergonomic trait handlers implement
//! 2. An object-safe `MessageHandlerDyn` with boxed futures is blanket-implemented
//! 3. `BoxMessageHandler` wraps `Box<dyn MessageHandlerDyn>` so the dispatcher
//!    can hold heterogeneous handlers in one map

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use pagechat_types::error::HandlerError;
use pagechat_types::message::Message;
use tracing::debug;

use super::transport::{Transport, send_to_all_active_tabs};

/// A unit of logic bound to exactly one message kind.
pub trait MessageHandler: Send + Sync {
    /// Process one message. An `Err` is contained by the dispatcher.
    fn handle(&self, message: &Message) -> impl Future<Output = Result<(), HandlerError>> + Send;
}

/// Object-safe version of [`MessageHandler`] with a boxed future.
pub trait MessageHandlerDyn: Send + Sync {
    fn handle_boxed<'a>(
        &'a self,
        message: &'a Message,
    ) -> Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send + 'a>>;
}

impl<T: MessageHandler> MessageHandlerDyn for T {
    fn handle_boxed<'a>(
        &'a self,
        message: &'a Message,
    ) -> Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send + 'a>> {
        Box::pin(self.handle(message))
    }
}

/// Type-erased handler held by the dispatcher.
pub struct BoxMessageHandler {
    inner: Box<dyn MessageHandlerDyn>,
}

impl BoxMessageHandler {
    pub fn new<T: MessageHandler + 'static>(handler: T) -> Self {
        Self {
            inner: Box::new(handler),
        }
    }

    pub async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        self.inner.handle_boxed(message).await
    }
}

/// Forwards an icon click from the background context to every active tab,
/// where the content context toggles its sidebar.
pub struct IconClickHandler<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> IconClickHandler<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }
}

impl<T: Transport> MessageHandler for IconClickHandler<T> {
    async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        let responses = send_to_all_active_tabs(self.transport.as_ref(), message).await?;
        debug!(delivered = responses.len(), "icon click forwarded");
        Ok(())
    }
}

/// Forwards a theme choice made in one tab to every active tab.
pub struct ThemeChangeHandler<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> ThemeChangeHandler<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }
}

impl<T: Transport> MessageHandler for ThemeChangeHandler<T> {
    async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        let responses = send_to_all_active_tabs(self.transport.as_ref(), message).await?;
        debug!(
            theme = message.payload.as_deref().unwrap_or("<none>"),
            delivered = responses.len(),
            "theme change forwarded"
        );
        Ok(())
    }
}
