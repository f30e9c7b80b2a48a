//! Shared domain types for pagechat.
//!
//! Wire messages exchanged between extension contexts, chat sessions as they
//! are persisted, page content, settings values, configuration, and the error
//! enums shared by every other crate.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod content;
pub mod error;
pub mod llm;
pub mod message;
pub mod settings;
