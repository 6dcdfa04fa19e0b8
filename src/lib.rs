//! # Character Generator
//!
//! Backend for an AI character-profile generator. A free-form description
//! (or an existing profile plus change instructions) is sent to a
//! chat-completion model through OpenRouter; whatever text comes back is
//! repaired into JSON and coerced into the character schema expected by
//! downstream agent runtimes.
//!
//! The crate also proxies token price lookups and turns uploaded text
//! documents into knowledge sentences.

pub mod character;
pub mod knowledge;
pub mod llms;
pub mod price;
pub mod server;
pub mod utilities;

pub use character::{CharacterPipeline, CharacterProfile, PipelineError};
pub use llms::base_llm::BaseLLM;
pub use utilities::converter::{normalize, JsonRepairError};

/// Library version reported by `/health`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
