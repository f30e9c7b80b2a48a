//! Application configuration types.
//!
//! `AppConfig` is the top-level `config.toml` in the data directory.
//! Every field has a default so a missing or partial file is fine.

use serde::{Deserialize, Serialize};

use crate::llm::OutputLanguage;

/// Top-level configuration for pagechat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model identifier passed to the generation endpoint.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the generation API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Token budget for page content.
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: u32,

    /// Characters per token used by the size estimate.
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: u32,

    /// Default output language (`auto`, `en`, `es`, ...).
    #[serde(default)]
    pub output_language: OutputLanguage,

    /// How long a tab send waits for the content context to reply.
    #[serde(default = "default_tab_reply_timeout_ms")]
    pub tab_reply_timeout_ms: u64,
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_max_input_tokens() -> u32 {
    1_048_576
}

fn default_chars_per_token() -> u32 {
    4
}

fn default_tab_reply_timeout_ms() -> u64 {
    5_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base_url: default_api_base_url(),
            max_input_tokens: default_max_input_tokens(),
            chars_per_token: default_chars_per_token(),
            output_language: OutputLanguage::Auto,
            tab_reply_timeout_ms: default_tab_reply_timeout_ms(),
        }
    }
}
