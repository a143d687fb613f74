//! Model gateway: the one place the external model is called.
//!
//! The gateway is built once at startup and is either `Ready` (holding a
//! provider) or `Unavailable` (holding the reason). Every call produces a
//! [`GenerationResult`]; provider errors stop here and are turned into fixed
//! fallback wording for the user.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};
use tutorbridge_config::AppConfig;
use tutorbridge_core::error::ProviderError;
use tutorbridge_core::message::Exchange;
use tutorbridge_core::provider::{GenerationConfig, Provider, ProviderRequest, Turn};
use tutorbridge_providers::GeminiProvider;

/// Reply used when no model client exists.
pub const UNAVAILABLE_REPLY: &str = "Sorry, the AI service is currently unavailable.";
/// Reply used when the model returned zero candidates.
pub const EMPTY_CANDIDATES_REPLY: &str =
    "I couldn't generate a response, possibly due to content restrictions.";
/// Reply used on transport, HTTP, or API failures.
pub const TRANSPORT_ERROR_REPLY: &str =
    "Sorry, there was a technical problem contacting the AI assistant.";
/// Reply used when a response arrived but no text could be read from it.
pub const EXTRACTION_ERROR_REPLY: &str = "Sorry, there was an issue reading the AI's response.";

const PROBE_PROMPT: &str = "Say ok if you are working.";

/// Model id and sampling parameters applied to every request.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub model: String,
    pub generation: GenerationConfig,
}

impl ModelSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.name.clone(),
            generation: GenerationConfig {
                max_output_tokens: config.model.max_output_tokens,
                temperature: config.model.temperature,
                candidate_count: 1,
            },
        }
    }
}

/// Outcome of one generation attempt.
#[derive(Debug, Clone)]
pub enum GenerationResult {
    /// Trimmed, non-empty text of the primary candidate
    Success(String),
    /// The call succeeded but returned no candidates
    EmptyCandidates { block_reason: Option<String> },
    /// Network, HTTP, or response-decoding failure
    TransportError(ProviderError),
    /// The gateway was never initialized; no I/O was attempted
    Unavailable,
}

impl GenerationResult {
    /// The text shown to the user for this outcome.
    pub fn reply_text(&self) -> String {
        match self {
            GenerationResult::Success(text) => text.clone(),
            GenerationResult::EmptyCandidates { block_reason: None } => {
                EMPTY_CANDIDATES_REPLY.to_string()
            }
            GenerationResult::EmptyCandidates {
                block_reason: Some(reason),
            } => format!("{EMPTY_CANDIDATES_REPLY} (Reason: {reason})"),
            GenerationResult::TransportError(e) if e.is_extraction_failure() => {
                EXTRACTION_ERROR_REPLY.to_string()
            }
            GenerationResult::TransportError(_) => TRANSPORT_ERROR_REPLY.to_string(),
            GenerationResult::Unavailable => UNAVAILABLE_REPLY.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Success(_))
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationResult::Success(_) => "success",
            GenerationResult::EmptyCandidates { .. } => "empty_candidates",
            GenerationResult::TransportError(_) => "transport_error",
            GenerationResult::Unavailable => "unavailable",
        }
    }
}

/// Immutable handle to the external model, shared by all requests.
#[derive(Clone)]
pub enum ModelGateway {
    Ready {
        provider: Arc<dyn Provider>,
        settings: ModelSettings,
    },
    Unavailable {
        reason: String,
    },
}

impl std::fmt::Debug for ModelGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelGateway::Ready { provider, settings } => f
                .debug_struct("Ready")
                .field("provider", &provider.name())
                .field("settings", settings)
                .finish(),
            ModelGateway::Unavailable { reason } => f
                .debug_struct("Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

impl ModelGateway {
    pub fn ready(provider: Arc<dyn Provider>, settings: ModelSettings) -> Self {
        ModelGateway::Ready { provider, settings }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        ModelGateway::Unavailable {
            reason: reason.into(),
        }
    }

    /// Build the gateway from configuration.
    ///
    /// Never fails: a missing key, a client that cannot be built, or a failed
    /// startup probe all produce `Unavailable` so the server still starts.
    pub async fn initialize(config: &AppConfig) -> Self {
        let settings = ModelSettings::from_config(config);
        info!(model = %settings.model, "Initializing model gateway");

        let provider: Arc<dyn Provider> = match GeminiProvider::from_config(config) {
            Ok(p) => Arc::new(p),
            Err(e) => {
                error!(error = %e, "Model initialization failed");
                return Self::unavailable(e.to_string());
            }
        };

        let gateway = Self::ready(provider, settings);
        if config.model.startup_probe {
            gateway.probe().await
        } else {
            gateway
        }
    }

    /// Issue a one-shot test generation.
    ///
    /// A transport failure makes the gateway unavailable; an empty answer is
    /// only logged.
    pub async fn probe(self) -> Self {
        let ModelGateway::Ready { provider, settings } = &self else {
            return self;
        };

        info!("Performing a quick test generation");
        let request = ProviderRequest {
            model: settings.model.clone(),
            turns: vec![Turn::user(PROBE_PROMPT)],
            generation: GenerationConfig {
                candidate_count: 1,
                ..settings.generation.clone()
            },
        };

        match provider.complete(request).await {
            Ok(resp) => match resp.primary().and_then(|c| c.text.as_deref()) {
                Some(text) => {
                    let sample: String = text.chars().take(80).collect();
                    info!(sample = %sample, "Model initialized successfully");
                    self
                }
                None => {
                    warn!(
                        block_reason = ?resp.block_reason,
                        "Model initialized, but test response was empty"
                    );
                    self
                }
            },
            Err(e) => {
                error!(error = %e, "Model initialization failed");
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ModelGateway::Ready { .. })
    }

    /// Why the gateway is unavailable, if it is.
    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            ModelGateway::Ready { .. } => None,
            ModelGateway::Unavailable { reason } => Some(reason),
        }
    }

    /// Generate a reply to `message` given the (already windowed) history.
    ///
    /// Exactly one provider call; errors are logged and folded into the
    /// result, never returned.
    pub async fn generate(&self, history: &[Exchange], message: &str) -> GenerationResult {
        let (provider, settings) = match self {
            ModelGateway::Ready { provider, settings } => (provider, settings),
            ModelGateway::Unavailable { reason } => {
                error!(reason = %reason, "Model is not initialized, cannot process request");
                return GenerationResult::Unavailable;
            }
        };

        let mut turns: Vec<Turn> = history.iter().map(Turn::from).collect();
        turns.push(Turn::user(message));

        let request = ProviderRequest {
            model: settings.model.clone(),
            turns,
            generation: settings.generation.clone(),
        };

        info!(
            model = %settings.model,
            history = history.len(),
            "Sending query to model"
        );
        let started = Instant::now();
        let outcome = provider.complete(request).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let response = match outcome {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, elapsed_ms, "Error calling model API");
                return GenerationResult::TransportError(e);
            }
        };

        let (prompt_tokens, completion_tokens, total_tokens) = response
            .usage
            .as_ref()
            .map_or((0, 0, 0), |u| (u.prompt_tokens, u.completion_tokens, u.total_tokens));
        info!(
            elapsed_ms,
            candidates = response.candidates.len(),
            model_version = %response.model,
            prompt_tokens,
            completion_tokens,
            total_tokens,
            "Model responded"
        );

        let Some(primary) = response.primary() else {
            warn!(block_reason = ?response.block_reason, "Empty response candidates from model");
            return GenerationResult::EmptyCandidates {
                block_reason: response.block_reason.clone(),
            };
        };

        match primary.text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => GenerationResult::Success(text.to_string()),
            _ => {
                let e = ProviderError::MalformedResponse(format!(
                    "primary candidate has no text (finish reason: {})",
                    primary.finish_reason.as_deref().unwrap_or("unknown")
                ));
                error!(error = %e, "Error extracting text from model response");
                GenerationResult::TransportError(e)
            }
        }
    }
}
