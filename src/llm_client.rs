use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

use crate::credential::ApiKey;

/// One prompt-in / text-out call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System-level instruction.
    pub system: String,
    /// User-level message.
    pub user: String,
    pub temperature: f32,
}

/// Errors returned by the language model client.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// HTTP transport failure.
    #[error("model request failed: {0}")]
    Transport(#[source] reqwest::Error),
    /// The call exceeded the configured timeout.
    #[error("model request timed out")]
    Timeout,
    /// Upstream responded with an error status.
    #[error("model returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    /// The response envelope could not be decoded.
    #[error("failed to decode model response: {0}")]
    Decode(String),
    /// The response carried no text (blocked, or no candidates).
    #[error("model returned no text content ({reason})")]
    EmptyResponse { reason: String },
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ModelError::Timeout
        } else {
            ModelError::Transport(err)
        }
    }
}

/// External language model used by the scorer and the generator.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Sends one request and returns the model's raw text.
    async fn complete(
        &self,
        credential: &ApiKey,
        request: CompletionRequest,
    ) -> Result<String, ModelError>;

    /// Model identifier, for logs.
    fn model_id(&self) -> &str;
}

// ============ Gemini wire types ============

#[doc(hidden)]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub system_instruction: Content,
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[doc(hidden)]
#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[doc(hidden)]
#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[doc(hidden)]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub response_mime_type: String,
}

#[doc(hidden)]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[doc(hidden)]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[doc(hidden)]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Builds the `generateContent` body for a request.
#[doc(hidden)]
pub fn build_request(request: &CompletionRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: Some(request.system.clone()),
            }],
        },
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: Some(request.user.clone()),
            }],
        }],
        generation_config: GenerationConfig {
            temperature: request.temperature,
            response_mime_type: "application/json".to_string(),
        },
    }
}

/// Concatenates the text parts of the first candidate.
#[doc(hidden)]
pub fn response_text(response: GenerateContentResponse) -> Result<String, ModelError> {
    let block_reason = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason);
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(ModelError::EmptyResponse {
            reason: block_reason.unwrap_or_else(|| "no candidates".to_string()),
        });
    };

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ModelError::EmptyResponse {
            reason: candidate
                .finish_reason
                .or(block_reason)
                .unwrap_or_else(|| "empty text".to_string()),
        });
    }
    Ok(text)
}

/// Client for the Gemini `generateContent` REST endpoint.
///
/// Holds no credential: the key travels with each call.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Creates a new `GeminiClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root, e.g. `https://generativelanguage.googleapis.com`.
    /// * `model` - Model name, e.g. `gemini-2.5-flash`.
    /// * `timeout` - Per-call timeout.
    pub fn new(base_url: String, model: String, timeout: Duration) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ModelError::Transport)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.trim_start_matches("models/").to_string(),
        })
    }

    /// Full `generateContent` URL for the configured model.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn complete(
        &self,
        credential: &ApiKey,
        request: CompletionRequest,
    ) -> Result<String, ModelError> {
        let url = self.endpoint();
        tracing::debug!(
            "Calling {} (temperature {})",
            self.model,
            request.temperature
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", credential.expose())
            .json(&build_request(&request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let body = sanitize_error_body(&body);
            tracing::warn!("Model returned {}: {}", status, body);
            return Err(ModelError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
            ModelError::Decode(format!("{} (body: {})", e, sanitize_error_body(&body)))
        })?;
        response_text(parsed)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

fn key_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"AIza[0-9A-Za-z_\-]{20,}",
            r"sk-[A-Za-z0-9_\-]{20,}",
            r"ya29\.[0-9A-Za-z_\-]{20,}",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

/// Collapses whitespace, redacts key-shaped tokens and truncates.
pub fn sanitize_error_body(raw: &str) -> String {
    let mut sanitized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    for regex in key_patterns() {
        sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
    }

    const MAX_ERROR_BODY_CHARS: usize = 256;
    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_client_creation() {
        let client = GeminiClient::new(
            "https://example.com/".to_string(),
            "models/gemini-2.5-flash".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "https://example.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(client.model_id(), "gemini-2.5-flash");
    }

    #[test]
    fn test_request_body_shape() {
        let body = build_request(&CompletionRequest {
            system: "be strict".to_string(),
            user: "score this".to_string(),
            temperature: 0.3,
        });
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "be strict");
        assert!(value["systemInstruction"].get("role").is_none());
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "score this");
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
        let temperature = value["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "{\"a\":"}, {"text": " 1}"}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(response_text(response).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_blocked_prompt_is_empty_response() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        match response_text(response) {
            Err(ModelError::EmptyResponse { reason }) => assert_eq!(reason, "SAFETY"),
            other => panic!("expected EmptyResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_redaction_patterns_compiled_once() {
        let first = key_patterns().as_ptr();
        assert_eq!(key_patterns().len(), 3);
        assert_eq!(first, key_patterns().as_ptr());

        for _ in 0..3 {
            let sanitized = sanitize_error_body("token sk-abcdefghijklmnopqrstuvwxyz rejected");
            assert_eq!(sanitized, "token [REDACTED] rejected");
        }
    }

    #[test]
    fn test_sanitize_redacts_and_truncates() {
        let body = format!(
            "bad key AIzaSyA1234567890abcdefghijklmnop {}",
            "x".repeat(400)
        );
        let sanitized = sanitize_error_body(&body);
        assert!(sanitized.contains("[REDACTED]"));
        assert!(!sanitized.contains("AIzaSy"));
        assert!(sanitized.ends_with("...[truncated]"));
    }
}
