//! GeminiClient -- concrete [`GenerationClient`] for Google Gemini.
//!
//! The API key arrives per call as a [`SecretString`] and is only exposed
//! when building the request header. It never appears in `Debug` output or
//! logs.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use pagechat_core::llm::{GenerationClient, TextStream};
use pagechat_types::config::AppConfig;
use pagechat_types::llm::GenerationError;

use super::streaming::create_gemini_stream;
use super::types::GeminiRequest;

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Streaming Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Create a client for `model` against the public endpoint.
    ///
    /// Only connecting is time-limited; a long generation is never cut off.
    pub fn new(model: impl Into<String>) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GenerationError::Request(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, GenerationError> {
        Ok(Self::new(config.model.clone())?.with_base_url(config.api_base_url.clone()))
    }

    /// Override the base URL (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Full URL of the streaming endpoint.
    pub fn stream_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl GenerationClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, credential: &SecretString, prompt: String) -> TextStream {
        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "starting gemini stream");
        create_gemini_stream(
            self.client.clone(),
            self.stream_url(),
            GeminiRequest::from_prompt(prompt),
            SecretString::from(credential.expose_secret().to_owned()),
        )
    }
}
