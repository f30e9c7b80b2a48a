//! Infrastructure layer for pagechat.
//!
//! Contains implementations of the ports defined in `pagechat-core`: the
//! JSON-file key-value store, the in-process tab bus, the Gemini streaming
//! client, and page text extraction. Also loads configuration.

pub mod config;
pub mod extract;
pub mod llm;
pub mod storage;
pub mod transport;
