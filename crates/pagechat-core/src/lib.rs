//! Business logic and port trait definitions for pagechat.
//!
//! This crate defines the "ports" (store, transport, extractor, generation
//! client) that the infrastructure layer implements, plus everything that
//! runs on top of them. It depends only on `pagechat-types` -- never on
//! `pagechat-infra` or any network/filesystem crate.

pub mod chat;
pub mod content;
pub mod llm;
pub mod message;
pub mod settings;
pub mod storage;
