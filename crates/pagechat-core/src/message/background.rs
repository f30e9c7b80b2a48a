//! Background-context entry points.
//!
//! The background context receives two kinds of input: toolbar icon clicks
//! from the browser, and raw runtime messages from content contexts. Both
//! end up in the [`MessageDispatcher`].

use std::sync::Arc;

use pagechat_types::message::{Message, MessageKind, TabInfo};
use tracing::{debug, instrument};

use super::dispatcher::MessageDispatcher;

/// Owns the dispatcher on the background side.
#[derive(Debug, Clone)]
pub struct BackgroundRuntime {
    dispatcher: Arc<MessageDispatcher>,
}

impl BackgroundRuntime {
    pub fn new(dispatcher: Arc<MessageDispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &MessageDispatcher {
        &self.dispatcher
    }

    /// The toolbar icon was clicked while `tab` was focused.
    ///
    /// Clicks on tabs without an id (or with no tab at all) are ignored.
    /// Returns whether a message was dispatched.
    #[instrument(skip(self))]
    pub async fn on_icon_clicked(&self, tab: Option<TabInfo>) -> bool {
        match tab.and_then(|t| t.id) {
            Some(_) => {
                self.dispatcher
                    .dispatch(&Message::new(MessageKind::IconClicked))
                    .await;
                true
            }
            None => {
                debug!("icon clicked without a target tab");
                false
            }
        }
    }

    /// A raw runtime message arrived from another context.
    ///
    /// Returns `None` for values that are not ours (no `messageType`), so
    /// other listeners can answer them. Otherwise dispatches and returns
    /// `Some(true)`: delivery is acknowledged even when the handler failed.
    pub async fn on_message(&self, raw: &serde_json::Value) -> Option<bool> {
        let message = Message::from_wire(raw)?;
        debug!(kind = %message.kind, "background received message");
        self.dispatcher.dispatch(&message).await;
        Some(true)
    }
}
