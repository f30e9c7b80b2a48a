//! GenerationClient trait definition.
//!
//! A generation client turns one prompt into a lazy stream of text chunks.
//! Connection failures and mid-stream failures both surface as an `Err`
//! item; a stream that simply ends is a successful completion.

use std::pin::Pin;

use futures_util::Stream;
use secrecy::SecretString;

use pagechat_types::llm::GenerationError;

/// Boxed stream of generated text chunks.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, GenerationError>> + Send + 'static>>;

/// Trait for streaming text generation backends.
///
/// The credential is passed per call because it is read from the settings
/// store at submit time and may change between turns.
///
/// Implementations live in pagechat-infra (e.g., `GeminiClient`).
pub trait GenerationClient: Send + Sync {
    /// Human-readable backend name (e.g., "gemini").
    fn name(&self) -> &str;

    /// Start generating a response to `prompt`.
    ///
    /// Returns immediately; no request is made until the stream is polled.
    fn generate(&self, credential: &SecretString, prompt: String) -> TextStream;
}
