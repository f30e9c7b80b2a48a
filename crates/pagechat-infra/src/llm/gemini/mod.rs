//! Google Gemini streaming client.
//!
//! [`GeminiClient`] implements
//! [`GenerationClient`](pagechat_core::llm::GenerationClient) against the
//! `streamGenerateContent` endpoint in SSE mode.

pub mod client;
pub mod streaming;
pub mod types;

pub use client::GeminiClient;
