//! Google Gemini provider implementation.
//!
//! Talks to the Generative Language REST API (`models/{model}:generateContent`)
//! directly over reqwest.
//!
//! Features:
//! - `x-goog-api-key` header authentication
//! - `user` / `model` turn labels in `contents`
//! - `generationConfig` with `maxOutputTokens`, `temperature`, `candidateCount`
//! - `promptFeedback.blockReason` surfaced on empty-candidate responses

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tutorbridge_config::AppConfig;
use tutorbridge_core::error::ProviderError;
use tutorbridge_core::provider::*;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const API_VERSION: &str = "v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Gemini `generateContent` provider.
pub struct GeminiProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_timeout(api_key, DEFAULT_TIMEOUT_SECS)
    }

    /// Create a provider whose HTTP client gives up after `timeout_secs`.
    pub fn with_timeout(api_key: impl Into<String>, timeout_secs: u64) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: "gemini".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Build from application config. Fails when no API key is configured.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::NotConfigured("GEMINI_API_KEY not found in environment variables".into())
            })?;

        Ok(Self::with_timeout(api_key, config.model.timeout_secs)?
            .with_base_url(&config.model.api_url))
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Endpoint for a model; accepts both `gemini-x` and `models/gemini-x`.
    fn endpoint(&self, model: &str) -> String {
        let model = model.trim().trim_start_matches("models/");
        format!("{}/{API_VERSION}/models/{model}:generateContent", self.base_url)
    }

    /// Convert our turns to Gemini `contents`.
    fn to_api_contents(turns: &[Turn]) -> Vec<ApiContent> {
        turns
            .iter()
            .map(|t| ApiContent {
                role: Some(
                    match t.role {
                        TurnRole::User => "user",
                        TurnRole::Model => "model",
                    }
                    .into(),
                ),
                parts: vec![ApiPart {
                    text: Some(t.text.clone()),
                }],
            })
            .collect()
    }

    fn build_body(request: &ProviderRequest) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: Self::to_api_contents(&request.turns),
            generation_config: ApiGenerationConfig {
                max_output_tokens: request.generation.max_output_tokens,
                temperature: request.generation.temperature,
                candidate_count: request.generation.candidate_count,
            },
        }
    }

    /// Convert the Gemini response body to our ProviderResponse.
    fn response_to_provider_response(resp: GenerateContentResponse, requested_model: &str) -> ProviderResponse {
        let candidates = resp
            .candidates
            .into_iter()
            .map(|c| {
                let texts: Vec<String> = c
                    .content
                    .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
                    .unwrap_or_default();
                Candidate {
                    text: (!texts.is_empty()).then(|| texts.concat()),
                    finish_reason: c.finish_reason,
                }
            })
            .collect();

        let usage = resp.usage_metadata.map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        });

        ProviderResponse {
            candidates,
            block_reason: resp.prompt_feedback.and_then(|f| f.block_reason),
            usage,
            model: resp
                .model_version
                .unwrap_or_else(|| requested_model.to_string()),
        }
    }
}

#[async_trait]
impl tutorbridge_core::Provider for GeminiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = self.endpoint(&request.model);
        let body = Self::build_body(&request);

        debug!(
            provider = "gemini",
            model = %request.model,
            turns = request.turns.len(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid Gemini API key".into(),
            ));
        }
        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Gemini API error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::MalformedResponse(format!(
                    "Failed to parse Gemini response: {e}"
                )))?;

        Ok(Self::response_to_provider_response(api_resp, &request.model))
    }
}

// --- Gemini API types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<ApiContent>,
    generation_config: ApiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiGenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
    candidate_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCandidate {
    #[serde(default)]
    content: Option<ApiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutorbridge_core::Provider;

    fn parse(json: &str) -> ProviderResponse {
        let resp: GenerateContentResponse = serde_json::from_str(json).unwrap();
        GeminiProvider::response_to_provider_response(resp, "gemini-1.5-flash-latest")
    }

    #[test]
    fn constructor() {
        let provider = GeminiProvider::new("test-key").unwrap();
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn constructor_with_base_url() {
        let provider = GeminiProvider::new("test-key")
            .unwrap()
            .with_base_url("http://localhost:9999/");
        assert_eq!(provider.base_url, "http://localhost:9999");
    }

    #[test]
    fn from_config_requires_key() {
        let config = AppConfig::default();
        let err = GeminiProvider::from_config(&config).unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn from_config_uses_configured_url() {
        let mut config = AppConfig::default();
        config.api_key = Some("k".into());
        config.model.api_url = "http://proxy.local/".into();
        let provider = GeminiProvider::from_config(&config).unwrap();
        assert_eq!(provider.base_url, "http://proxy.local");
    }

    #[test]
    fn debug_redacts_key() {
        let provider = GeminiProvider::new("very-secret").unwrap();
        assert!(!format!("{provider:?}").contains("very-secret"));
    }

    #[test]
    fn endpoint_normalizes_model_prefix() {
        let provider = GeminiProvider::new("k").unwrap();
        let expected = "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash-latest:generateContent";
        assert_eq!(provider.endpoint("gemini-1.5-flash-latest"), expected);
        assert_eq!(provider.endpoint("models/gemini-1.5-flash-latest"), expected);
    }

    #[test]
    fn request_body_wire_format() {
        let request = ProviderRequest {
            model: "gemini-1.5-flash-latest".into(),
            turns: vec![
                Turn::user("What is a cell?"),
                Turn {
                    role: TurnRole::Model,
                    text: "The basic unit of life.".into(),
                },
                Turn::user("And a tissue?"),
            ],
            generation: GenerationConfig::default(),
        };

        let body = serde_json::to_value(GeminiProvider::build_body(&request)).unwrap();
        assert_eq!(body["contents"].as_array().unwrap().len(), 3);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "And a tissue?");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 300);
        assert_eq!(body["generationConfig"]["candidateCount"], 1);
        assert!((body["generationConfig"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn parse_text_response() {
        let pr = parse(
            r#"{
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Cells are small. "}, {"text": "Very small."}]},
                    "finishReason": "STOP"
                }],
                "usageMetadata": {"promptTokenCount": 8, "candidatesTokenCount": 6, "totalTokenCount": 14},
                "modelVersion": "gemini-1.5-flash-002"
            }"#,
        );
        let primary = pr.primary().unwrap();
        assert_eq!(primary.text.as_deref(), Some("Cells are small. Very small."));
        assert_eq!(primary.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(pr.usage.unwrap().total_tokens, 14);
        assert_eq!(pr.model, "gemini-1.5-flash-002");
        assert!(pr.block_reason.is_none());
    }

    #[test]
    fn parse_blocked_response() {
        let pr = parse(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#);
        assert!(pr.candidates.is_empty());
        assert_eq!(pr.block_reason.as_deref(), Some("SAFETY"));
        assert_eq!(pr.model, "gemini-1.5-flash-latest");
    }

    #[test]
    fn parse_candidate_without_text() {
        let pr = parse(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#);
        assert_eq!(pr.candidates.len(), 1);
        assert!(pr.primary().unwrap().text.is_none());
    }
}
