//! LLM system for the character generator.
//!
//! - [`base_llm`] - The base trait for chat-completion backends
//! - [`providers`] - Concrete provider implementations (OpenRouter)

pub mod base_llm;
pub mod providers;

// Re-exports for convenience
pub use base_llm::{BaseLLM, BaseLLMState, CallOptions, LLMError, LLMMessage};
