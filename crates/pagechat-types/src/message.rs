//! Cross-context message types.
//!
//! A [`Message`] is the only thing that travels between the background
//! context and a page's content context. On the wire it is a JSON object
//! `{ "messageType": ..., "content"?: ... }`; anything without a
//! `messageType` field belongs to somebody else and is ignored.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of message kinds the extension understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// The toolbar icon was clicked; the content context toggles its sidebar.
    #[serde(rename = "clickExtIcon")]
    IconClicked,

    /// A theme was picked in one tab; payload is `"light"` or `"dark"`.
    #[serde(rename = "changeTheme")]
    ThemeChanged,

    /// A `messageType` value this build does not know. Never has a handler.
    #[serde(other, rename = "unknown")]
    Unknown,
}

impl MessageKind {
    /// Wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::IconClicked => "clickExtIcon",
            MessageKind::ThemeChanged => "changeTheme",
            MessageKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable cross-context message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "messageType")]
    pub kind: MessageKind,

    #[serde(rename = "content", default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl Message {
    /// Build a message without a payload.
    pub fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            payload: None,
        }
    }

    /// Build a message carrying a string payload.
    pub fn with_payload(kind: MessageKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: Some(payload.into()),
        }
    }

    /// Decode a raw wire value.
    ///
    /// Returns `None` when the value is not an object, has no `messageType`
    /// field, or its fields have the wrong JSON types.
    pub fn from_wire(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        if !object.contains_key("messageType") {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// Encode into the wire shape.
    pub fn to_wire(&self) -> serde_json::Value {
        // A struct of a unit enum and an optional string always serializes.
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Browser tab identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the browser reports about a tab. Some tabs (devtools, prerender)
/// have no id and cannot receive messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: Option<TabId>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Destination of a cross-context send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The privileged background context.
    Background,
    /// The content context of one tab.
    Tab(TabId),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Background => write!(f, "background"),
            Scope::Tab(id) => write!(f, "tab {id}"),
        }
    }
}
