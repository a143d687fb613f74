//! Provider trait: the abstraction over the hosted generative model.
//!
//! A Provider knows how to send an ordered turn history plus generation
//! parameters to a model and hand back the raw candidates. Turning those
//! candidates into a user-facing reply (and fallback wording) is the model
//! gateway's job, not the provider's.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::{Exchange, Role};

/// Model-facing label of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Text written by the end user
    User,
    /// The model's own earlier output
    Model,
}

impl From<Role> for TurnRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => TurnRole::User,
            Role::Bot => TurnRole::Model,
        }
    }
}

/// One entry of the history submitted to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }
}

impl From<&Exchange> for Turn {
    fn from(exchange: &Exchange) -> Self {
        Self {
            role: exchange.role.into(),
            text: exchange.content.clone(),
        }
    }
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Maximum tokens to generate
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Temperature (0.0 = deterministic, 2.0 = most random)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Number of candidates requested
    #[serde(default = "default_candidate_count")]
    pub candidate_count: u32,
}

fn default_max_output_tokens() -> u32 {
    300
}

fn default_temperature() -> f32 {
    0.7
}

fn default_candidate_count() -> u32 {
    1
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
            candidate_count: default_candidate_count(),
        }
    }
}

/// A single completion request. Built fresh for every inbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model identifier, e.g. "gemini-1.5-flash-latest"
    pub model: String,

    /// Ordered history, oldest first; the unanswered user message is last
    pub turns: Vec<Turn>,

    #[serde(default)]
    pub generation: GenerationConfig,
}

/// One proposed completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Candidate {
    /// Concatenated text parts; `None` when the candidate carried no text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A complete response from a provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Zero or more candidates
    #[serde(default)]
    pub candidates: Vec<Candidate>,

    /// Safety/policy reason the prompt was blocked, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Which model version actually responded
    #[serde(default)]
    pub model: String,
}

impl ProviderResponse {
    /// Convenience constructor for a single text candidate.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                text: Some(text.into()),
                finish_reason: Some("STOP".into()),
            }],
            ..Self::default()
        }
    }

    /// A response with no candidates, optionally carrying a block reason.
    pub fn blocked(reason: Option<&str>) -> Self {
        Self {
            block_reason: reason.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn primary(&self) -> Option<&Candidate> {
        self.candidates.first()
    }
}

/// The core Provider trait.
///
/// Implemented by the Gemini client and by test doubles. Callers only ever
/// hold an `Arc<dyn Provider>`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "gemini").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_maps_to_model_label() {
        let turn = Turn::from(&Exchange::bot("Earlier answer"));
        assert_eq!(turn.role, TurnRole::Model);
        assert_eq!(turn.text, "Earlier answer");

        let turn = Turn::from(&Exchange::user("Question"));
        assert_eq!(turn.role, TurnRole::User);
    }

    #[test]
    fn generation_defaults() {
        let cfg = GenerationConfig::default();
        assert_eq!(cfg.max_output_tokens, 300);
        assert!((cfg.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(cfg.candidate_count, 1);
    }

    #[test]
    fn blocked_response_has_no_candidates() {
        let resp = ProviderResponse::blocked(Some("SAFETY"));
        assert!(resp.primary().is_none());
        assert_eq!(resp.block_reason.as_deref(), Some("SAFETY"));
    }

    #[test]
    fn text_response_primary_candidate() {
        let resp = ProviderResponse::text("Hello");
        assert_eq!(resp.primary().and_then(|c| c.text.as_deref()), Some("Hello"));
    }
}
