//! Message dispatch facade.
//!
//! Routes a [`Message`] to the one handler registered for its kind. The
//! handler map is built once at startup and passed around by value or `Arc`;
//! there is no module-level registry.
//!
//! Failure is contained here: a missing handler or a failing handler is
//! logged and `dispatch` still completes normally, so the sender is never
//! blocked by the receiver's problems.

use std::collections::HashMap;
use std::sync::Arc;

use pagechat_types::message::{Message, MessageKind};
use tracing::{debug, error, info};

use super::handler::{BoxMessageHandler, IconClickHandler, MessageHandler, ThemeChangeHandler};
use super::transport::Transport;

/// Routes messages to handlers keyed by [`MessageKind`].
#[derive(Default)]
pub struct MessageDispatcher {
    handlers: HashMap<MessageKind, BoxMessageHandler>,
}

impl MessageDispatcher {
    /// An empty dispatcher; every message is unsupported until registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// The background context's standard wiring: icon clicks and theme
    /// changes both fan out to active tabs over `transport`.
    pub fn with_default_handlers<T: Transport + 'static>(transport: Arc<T>) -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(
            MessageKind::IconClicked,
            IconClickHandler::new(Arc::clone(&transport)),
        );
        dispatcher.register(MessageKind::ThemeChanged, ThemeChangeHandler::new(transport));
        dispatcher
    }

    /// Bind `handler` to `kind`. A later registration for the same kind
    /// replaces the earlier one.
    pub fn register<H: MessageHandler + 'static>(&mut self, kind: MessageKind, handler: H) {
        if self
            .handlers
            .insert(kind, BoxMessageHandler::new(handler))
            .is_some()
        {
            debug!(%kind, "replaced existing message handler");
        }
    }

    /// Whether a handler is bound to `kind`.
    pub fn handles(&self, kind: MessageKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Route `message` to its handler and wait for it to finish.
    ///
    /// Never fails: unsupported kinds and handler errors are logged.
    pub async fn dispatch(&self, message: &Message) {
        let Some(handler) = self.handlers.get(&message.kind) else {
            info!(kind = %message.kind, "unsupported message type");
            return;
        };

        if let Err(e) = handler.handle(message).await {
            error!(kind = %message.kind, error = %e, "error handling message");
        }
    }
}

impl std::fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&'static str> = self.handlers.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("MessageDispatcher")
            .field("kinds", &kinds)
            .finish()
    }
}
