//! `POST /ask`, the webhook endpoint.
//!
//! Accepts two body shapes:
//!
//! - structured: `{"currentMessage": "...", "context": [...]}` (context optional)
//! - legacy webhook: `{"queryResult": {"queryText": "..."}}`
//!
//! The structured shape gets the updated context back; the legacy shape only
//! gets `fulfillmentText`.

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};
use tutorbridge_agent::model_gateway::UNAVAILABLE_REPLY;
use tutorbridge_core::context::ConversationContext;

use crate::SharedState;

pub const INVALID_REQUEST_REPLY: &str = "Error: Invalid request received.";
pub const EMPTY_MESSAGE_REPLY: &str = "Please enter a question.";
pub const INTERNAL_ERROR_REPLY: &str = "An unexpected server error occurred.";

/// Response body for every `/ask` outcome.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskResponse {
    pub fulfillment_text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ConversationContext>,
}

/// A parsed `/ask` body.
#[derive(Debug)]
pub enum AskRequest {
    Structured {
        message: String,
        context: ConversationContext,
    },
    Legacy {
        message: String,
    },
}

impl AskRequest {
    /// Parse raw bytes. Anything that is not a JSON object of a known shape
    /// is rejected; a bad `context` is not (it resets to empty).
    pub fn parse(body: &[u8]) -> Result<Self, ApiError> {
        let value: Value = serde_json::from_slice(body).map_err(|e| {
            warn!(error = %e, "Invalid or empty JSON received in request");
            ApiError::InvalidRequest
        })?;

        let Some(obj) = value.as_object() else {
            warn!("Request body is not a JSON object");
            return Err(ApiError::InvalidRequest);
        };

        if obj.contains_key("currentMessage") || obj.contains_key("context") {
            let message = obj
                .get("currentMessage")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let context = ConversationContext::from_value(obj.get("context"));
            return Ok(AskRequest::Structured { message, context });
        }

        if let Some(query_result) = obj.get("queryResult") {
            let message = query_result
                .get("queryText")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Ok(AskRequest::Legacy { message });
        }

        warn!("Request body has neither currentMessage nor queryResult.queryText");
        Err(ApiError::InvalidRequest)
    }

    pub fn message(&self) -> &str {
        match self {
            AskRequest::Structured { message, .. } | AskRequest::Legacy { message } => message,
        }
    }

    /// Split into message, context (empty for legacy), and whether the
    /// caller expects the context back.
    fn into_parts(self) -> (String, ConversationContext, bool) {
        match self {
            AskRequest::Structured { message, context } => (message, context, true),
            AskRequest::Legacy { message } => (message, ConversationContext::new(), false),
        }
    }
}

/// Every non-200 outcome of `/ask`.
#[derive(Debug)]
pub enum ApiError {
    /// Absent, unparseable, or unrecognized body
    InvalidRequest,
    /// The message was empty or whitespace
    EmptyMessage { context: Option<ConversationContext> },
    /// The model gateway was never initialized
    Unavailable { context: Option<ConversationContext> },
    /// Anything unexpected; detail is logged, never returned
    Internal(tutorbridge_core::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::InvalidRequest => (
                StatusCode::BAD_REQUEST,
                AskResponse {
                    fulfillment_text: INVALID_REQUEST_REPLY.into(),
                    context: None,
                },
            ),
            ApiError::EmptyMessage { context } => (
                StatusCode::BAD_REQUEST,
                AskResponse {
                    fulfillment_text: EMPTY_MESSAGE_REPLY.into(),
                    context,
                },
            ),
            ApiError::Unavailable { context } => (
                StatusCode::SERVICE_UNAVAILABLE,
                AskResponse {
                    fulfillment_text: UNAVAILABLE_REPLY.into(),
                    context,
                },
            ),
            ApiError::Internal(e) => {
                error!(error = %e, "Unexpected error in /ask");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    AskResponse {
                        fulfillment_text: INTERNAL_ERROR_REPLY.into(),
                        context: Some(ConversationContext::new()),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

pub async fn ask_handler(
    State(state): State<SharedState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let body = body.map_err(|e| {
        warn!(error = %e, status = %e.status(), "Request body rejected");
        ApiError::InvalidRequest
    })?;
    let request = AskRequest::parse(&body)?;
    let (message, context, carries_context) = request.into_parts();

    info!(
        message_len = message.len(),
        context_len = context.len(),
        carries_context,
        "Ask request received"
    );

    if message.trim().is_empty() {
        warn!("Empty message received");
        return Err(ApiError::EmptyMessage {
            context: carries_context.then_some(context),
        });
    }

    if !state.pipeline.is_available() {
        error!("Model is not initialized, cannot process request");
        return Err(ApiError::Unavailable {
            context: carries_context.then_some(context),
        });
    }

    // Run on its own task so a panic anywhere in the pipeline surfaces as a
    // JoinError here instead of tearing down the connection.
    let pipeline = state.pipeline.clone();
    let outcome = tokio::spawn(async move { pipeline.answer(&message, context).await })
        .await
        .map_err(|e| ApiError::Internal(tutorbridge_core::Error::Internal(e.to_string())))?;

    Ok(Json(AskResponse {
        fulfillment_text: outcome.fulfillment_text,
        context: carries_context.then_some(outcome.context),
    }))
}
