//! Gemini API request and response types (serde only).

use serde::{Deserialize, Serialize};

/// Body of a `streamGenerateContent` call.
#[derive(Debug, Clone, Serialize)]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
}

impl GeminiRequest {
    /// A single-turn request carrying the whole prompt as one user part.
    pub fn from_prompt(prompt: String) -> Self {
        Self {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: Some(prompt) }],
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// One SSE `data:` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiStreamChunk {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(default, rename = "promptFeedback")]
    pub prompt_feedback: Option<GeminiPromptFeedback>,
    #[serde(default)]
    pub error: Option<GeminiErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
    #[serde(default, rename = "finishReason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiPromptFeedback {
    #[serde(default, rename = "blockReason")]
    pub block_reason: Option<String>,
}

/// `{"error": {...}}` body returned with non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiErrorEnvelope {
    pub error: GeminiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(GeminiRequest::from_prompt("hi".to_string())).unwrap();
        assert_eq!(
            body,
            json!({"contents": [{"role": "user", "parts": [{"text": "hi"}]}]})
        );
    }

    #[test]
    fn error_envelope_parses() {
        let raw = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        let env: GeminiErrorEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(env.error.code, Some(400));
        assert_eq!(env.error.status.as_deref(), Some("INVALID_ARGUMENT"));
    }
}
