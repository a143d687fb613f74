//! Error types for the TutorBridge domain.
//!
//! Uses `thiserror` for ergonomic error definitions.

use thiserror::Error;

/// Failures the HTTP layer reports as a generic 500. Model failures never
/// reach here; they are folded into a fallback reply.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures talking to the external generative model.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    /// The call succeeded but the body could not be read as a reply.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// True when the failure happened after a response body was received,
    /// i.e. the reply itself could not be interpreted.
    pub fn is_extraction_failure(&self) -> bool {
        matches!(self, ProviderError::MalformedResponse(_))
    }
}
