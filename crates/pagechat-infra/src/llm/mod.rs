//! Generation client implementations.

pub mod gemini;

use pagechat_core::llm::BoxGenerationClient;
use pagechat_types::config::AppConfig;
use pagechat_types::llm::GenerationError;

pub use gemini::GeminiClient;

/// Build the configured generation backend.
pub fn build_generation_client(config: &AppConfig) -> Result<BoxGenerationClient, GenerationError> {
    let client = GeminiClient::from_config(config)?;
    tracing::debug!(model = client.model(), "generation client ready");
    Ok(BoxGenerationClient::new(client))
}
