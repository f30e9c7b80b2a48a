//! SSE stream creation and payload parsing for Gemini.
//!
//! With `alt=sse` every event is a `data:` line holding one JSON
//! `GenerateContentResponse`:
//! ```text
//! data: {"candidates":[{"content":{"parts":[{"text":"Hel"}],"role":"model"}}]}
//!
//! data: {"candidates":[{"content":{"parts":[{"text":"lo"}],"role":"model"},"finishReason":"STOP"}]}
//! ```
//! The stream ends when the connection closes.

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};

use pagechat_core::llm::TextStream;
use pagechat_types::llm::GenerationError;

use super::types::{GeminiErrorEnvelope, GeminiRequest, GeminiStreamChunk};

/// Finish reasons that mean the answer was withheld.
const BLOCKED_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

/// Parse one SSE `data:` payload into the text it carries.
///
/// - `Ok(Some(text))` for payloads with candidate text
/// - `Ok(None)` for keepalives and metadata-only payloads
/// - `Err(_)` for error payloads, blocked responses, or malformed JSON
pub fn parse_sse_data(data: &str) -> Result<Option<String>, GenerationError> {
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }

    let chunk: GeminiStreamChunk = serde_json::from_str(data)
        .map_err(|e| GenerationError::Deserialization(format!("{e}: {data}")))?;

    if let Some(error) = chunk.error {
        return Err(GenerationError::Stream(error.message));
    }

    let Some(candidate) = chunk.candidates.first() else {
        if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GenerationError::Stream(format!("prompt was blocked: {reason}")));
        }
        return Ok(None);
    };

    let text: String = candidate
        .content
        .iter()
        .flat_map(|c| c.parts.iter())
        .filter_map(|p| p.text.as_deref())
        .collect();

    if text.is_empty() {
        if let Some(reason) = candidate
            .finish_reason
            .as_deref()
            .filter(|r| BLOCKED_FINISH_REASONS.contains(r))
        {
            return Err(GenerationError::Stream(format!("response was blocked: {reason}")));
        }
        return Ok(None);
    }

    Ok(Some(text))
}

/// Map a non-success HTTP status and its body to a [`GenerationError`].
pub fn error_for_status(status: u16, body: &str) -> GenerationError {
    let message = serde_json::from_str::<GeminiErrorEnvelope>(body)
        .map(|env| env.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    match status {
        401 | 403 => GenerationError::AuthenticationFailed,
        429 => GenerationError::RateLimited,
        _ => GenerationError::Request(format!("HTTP {status}: {message}")),
    }
}

async fn send_request(
    client: &reqwest::Client,
    url: &str,
    body: &GeminiRequest,
    api_key: &SecretString,
) -> Result<reqwest::Response, GenerationError> {
    let response = client
        .post(url)
        .header("x-goog-api-key", api_key.expose_secret())
        .header("content-type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| GenerationError::Request(format!("HTTP request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let error_body = response.text().await.unwrap_or_default();
        return Err(error_for_status(status.as_u16(), &error_body));
    }
    Ok(response)
}

/// Open a streaming connection and yield text chunks as they arrive.
///
/// Nothing is sent until the returned stream is first polled. The first
/// error ends the stream.
pub fn create_gemini_stream(
    client: reqwest::Client,
    url: String,
    body: GeminiRequest,
    api_key: SecretString,
) -> TextStream {
    Box::pin(async_stream::stream! {
        let response = match send_request(&client, &url, &body, &api_key).await {
            Ok(response) => response,
            Err(e) => {
                yield Err(e);
                return;
            }
        };

        let mut events = response.bytes_stream().eventsource();
        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    yield Err(GenerationError::Stream(e.to_string()));
                    return;
                }
            };
            match parse_sse_data(&event.data) {
                Ok(Some(text)) => {
                    yield Ok(text);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "gemini stream reported an error");
                    yield Err(e);
                    return;
                }
            }
        }
    })
}
