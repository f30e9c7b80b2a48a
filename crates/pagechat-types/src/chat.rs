//! Chat session and message types.
//!
//! These are persisted verbatim in the key-value store under `chat_<id>`,
//! so the serde field names follow the stored record layout:
//! `{ id, messages: [{ content, isUser, timestamp }], url, lastUpdated }`
//! with millisecond timestamps.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Key prefix for persisted chat sessions.
pub const SESSION_KEY_PREFIX: &str = "chat_";

/// Globally unique, never reused session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Store key holding this session's record.
    pub fn storage_key(&self) -> String {
        format!("{SESSION_KEY_PREFIX}{}", self.0)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(SessionId)
    }
}

/// One entry in a conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "content")]
    pub text: String,

    #[serde(rename = "isUser")]
    pub from_user: bool,

    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// A message typed by the user, stamped now.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from_user: true,
            created_at: Utc::now(),
        }
    }

    /// A message produced by the assistant, stamped now.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from_user: false,
            created_at: Utc::now(),
        }
    }

    /// Speaker label used when serializing conversation history.
    pub fn speaker(&self) -> &'static str {
        if self.from_user { "User" } else { "Assistant" }
    }
}

/// The conversation tied to one page URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: SessionId,

    #[serde(default)]
    pub messages: Vec<ChatMessage>,

    #[serde(rename = "url")]
    pub page_url: String,

    #[serde(rename = "lastUpdated", with = "chrono::serde::ts_milliseconds")]
    pub last_updated: DateTime<Utc>,
}

impl ChatSession {
    /// A fresh, empty session for `page_url` with a new id.
    pub fn new(page_url: impl Into<String>) -> Self {
        Self {
            id: SessionId::new(),
            messages: Vec::new(),
            page_url: page_url.into(),
            last_updated: Utc::now(),
        }
    }

    /// Store key holding this session's record.
    pub fn storage_key(&self) -> String {
        self.id.storage_key()
    }
}
