//! The ask pipeline: everything between an inbound message and the reply.
//!
//! One request runs straight through:
//!
//! 1. **Window** the caller's validated context to the last `2 × depth` entries
//! 2. **Generate** a reply through the [`ModelGateway`] (single attempt)
//! 3. **Match** study resources against the user's message
//! 4. **Compose** the final text and the re-bounded context
//!
//! Nothing is stored between requests; the caller carries the context.

pub mod composer;
pub mod model_gateway;
pub mod pipeline;

pub use composer::{RESOURCES_HEADER, compose_reply};
pub use model_gateway::{GenerationResult, ModelGateway, ModelSettings};
pub use pipeline::{AskOutcome, AskPipeline};
