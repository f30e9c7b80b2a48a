//! Content-context side of the message channel.
//!
//! Each tab runs one receiver. It reacts to the messages the background
//! context fans out and keeps the little bit of UI state they drive.

use std::sync::{Mutex, PoisonError};

use pagechat_types::message::{Message, MessageKind};
use pagechat_types::settings::Theme;
use serde_json::{Value, json};
use tracing::{debug, warn};

/// What the sidebar in one tab currently looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SidebarView {
    pub visible: bool,
    pub theme: Theme,
}

#[derive(Debug, Default)]
pub struct ContentReceiver {
    view: Mutex<SidebarView>,
}

impl ContentReceiver {
    /// A hidden sidebar using `theme`.
    pub fn new(theme: Theme) -> Self {
        Self {
            view: Mutex::new(SidebarView {
                visible: false,
                theme,
            }),
        }
    }

    pub fn view(&self) -> SidebarView {
        *self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle a raw message from the background context.
    ///
    /// Returns the reply to send back, or `None` when the value is not one
    /// of ours.
    pub fn on_message(&self, raw: &Value) -> Option<Value> {
        let message = Message::from_wire(raw)?;
        let mut view = self.view.lock().unwrap_or_else(PoisonError::into_inner);

        match message.kind {
            MessageKind::IconClicked => {
                view.visible = !view.visible;
                debug!(visible = view.visible, "sidebar toggled");
            }
            MessageKind::ThemeChanged => match apply_theme(&message) {
                Some(theme) => {
                    view.theme = theme;
                    debug!(%theme, "theme applied");
                }
                None => {
                    warn!(payload = ?message.payload, "ignoring invalid theme payload");
                    return Some(json!({ "ok": false }));
                }
            },
            MessageKind::Unknown => {
                debug!("content context ignoring unknown message kind");
                return None;
            }
        }

        Some(json!({ "ok": true, "visible": view.visible, "theme": view.theme }))
    }
}

fn apply_theme(message: &Message) -> Option<Theme> {
    message.payload.as_deref()?.parse().ok()
}
