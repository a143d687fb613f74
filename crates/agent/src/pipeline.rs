//! Per-request orchestration: window → generate → match → compose.

use tracing::{debug, info};
use tutorbridge_config::AppConfig;
use tutorbridge_core::context::ConversationContext;
use tutorbridge_core::resources::ResourceTable;

use crate::composer::compose_reply;
use crate::model_gateway::{GenerationResult, ModelGateway};

/// Everything a handler needs to answer one message.
///
/// Built once at startup and shared behind an `Arc`; all fields are
/// read-only afterwards.
#[derive(Debug)]
pub struct AskPipeline {
    gateway: ModelGateway,
    resources: ResourceTable,
    max_depth: usize,
}

/// The result of answering one message.
#[derive(Debug, Clone)]
pub struct AskOutcome {
    /// Model reply (or fallback) plus any resources block
    pub fulfillment_text: String,

    /// Context to hand back to the caller, already bounded
    pub context: ConversationContext,

    /// What happened at the model
    pub generation: GenerationResult,
}

impl AskPipeline {
    pub fn new(gateway: ModelGateway, resources: ResourceTable, max_depth: usize) -> Self {
        Self {
            gateway,
            resources,
            max_depth,
        }
    }

    /// Build the pipeline the server uses: gateway from config (including
    /// the optional startup probe) and the configured resource table.
    pub async fn from_config(config: &AppConfig) -> Self {
        let gateway = ModelGateway::initialize(config).await;
        Self::new(gateway, config.resource_table(), config.context.max_depth)
    }

    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn is_available(&self) -> bool {
        self.gateway.is_available()
    }

    /// Answer `query` given the caller's (validated) context.
    pub async fn answer(&self, query: &str, context: ConversationContext) -> AskOutcome {
        let mut context = context.windowed(self.max_depth);
        debug!(
            context_len = context.len(),
            max_depth = self.max_depth,
            "Context windowed"
        );

        let generation = self.gateway.generate(context.entries(), query).await;
        let reply = generation.reply_text();

        let resources = self.resources.lookup(query);
        if resources.is_empty() {
            debug!("No relevant study resources found for this query");
        } else {
            info!(count = resources.len(), "Appending study resources to the response");
        }
        let fulfillment_text = compose_reply(&reply, &resources);

        context.record_turn(query, fulfillment_text.as_str(), self.max_depth);

        let preview: String = fulfillment_text.chars().take(200).collect();
        info!(
            outcome = generation.kind(),
            context_len = context.len(),
            preview = %preview,
            "Reply composed"
        );

        AskOutcome {
            fulfillment_text,
            context,
            generation,
        }
    }
}
