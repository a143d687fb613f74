//! # TutorBridge Core
//!
//! Domain types, traits, and error definitions for the TutorBridge study
//! assistant. This crate has **no framework dependencies**: it defines the
//! conversation model, the keyword resource table, and the provider trait
//! that the other crates implement against.
//!
//! Everything here is pure and synchronous except the [`Provider`] trait,
//! which is the single seam to the external generative model.

pub mod context;
pub mod error;
pub mod message;
pub mod provider;
pub mod resources;

// Re-export key types at crate root for ergonomics
pub use context::{ConversationContext, validate_context};
pub use error::{Error, ProviderError};
pub use message::{Exchange, Role};
pub use provider::{
    Candidate, GenerationConfig, Provider, ProviderRequest, ProviderResponse, Turn, TurnRole,
    Usage,
};
pub use resources::{ResourceEntry, ResourceTable};
