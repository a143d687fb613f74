//! Generative model providers for TutorBridge.
//!
//! All providers implement the `tutorbridge_core::Provider` trait.

pub mod gemini;

pub use gemini::GeminiProvider;
