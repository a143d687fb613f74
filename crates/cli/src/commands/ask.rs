//! `tutorbridge ask`: Answer one message without going through HTTP.

use serde_json::{Value, json};
use tutorbridge_agent::AskPipeline;
use tutorbridge_config::AppConfig;
use tutorbridge_core::context::ConversationContext;

pub async fn run(
    config: AppConfig,
    message: &str,
    context: Option<&str>,
    as_json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if message.trim().is_empty() {
        return Err("Please enter a question.".into());
    }

    let context = parse_context(context)?;
    let pipeline = AskPipeline::from_config(&config).await;
    if let Some(reason) = pipeline.gateway().unavailable_reason() {
        return Err(format!("Model unavailable: {reason}").into());
    }

    let outcome = pipeline.answer(message, context).await;

    if as_json {
        let body = json!({
            "fulfillmentText": outcome.fulfillment_text,
            "context": outcome.context,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("{}", outcome.fulfillment_text);
    }

    Ok(())
}

/// Invalid JSON is an error here; a well-formed but invalid context resets
/// to empty, the same as over HTTP.
fn parse_context(raw: Option<&str>) -> Result<ConversationContext, Box<dyn std::error::Error>> {
    let Some(raw) = raw else {
        return Ok(ConversationContext::new());
    };
    let value: Value = serde_json::from_str(raw).map_err(|e| format!("Invalid --context JSON: {e}"))?;
    Ok(ConversationContext::from_value(Some(&value)))
}
