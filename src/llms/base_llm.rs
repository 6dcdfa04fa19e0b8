//! Base LLM trait and shared types.
//!
//! Provides the trait every chat-completion backend implements, along with
//! the message, call-option and error types that flow through it. The
//! character pipeline only depends on this trait, so tests can substitute a
//! canned implementation for the HTTP provider.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default sampling temperature for character generation.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Default completion budget; a full character is a few thousand tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A single message in an LLM conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LLMMessage {
    /// `system`, `user` or `assistant`.
    pub role: String,
    pub content: String,
}

impl LLMMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

/// Generate a unique id for an LLM call, used to correlate log lines.
pub fn generate_call_id() -> String {
    Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// Call options
// ---------------------------------------------------------------------------

/// Per-call overrides. Anything left `None` falls back to the provider's
/// configured defaults.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Model identifier, e.g. `anthropic/claude-3.5-sonnet`.
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    /// Caller-supplied API key; takes precedence over the configured one.
    pub api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while talking to a chat-completion API.
#[derive(Debug, Error)]
pub enum LLMError {
    /// Neither the caller nor the configuration supplied a key.
    #[error("API key not set. Pass an X-API-Key header or set OPENROUTER_API_KEY.")]
    MissingApiKey,

    /// Transport failure (connect, timeout, body read).
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("LLM API error ({status}): {body}")]
    Status { status: u16, body: String },

    /// The API answered 2xx but the body was not a usable completion.
    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),
}

// ---------------------------------------------------------------------------
// BaseLLM trait
// ---------------------------------------------------------------------------

/// Trait for chat-completion backends.
#[async_trait]
pub trait BaseLLM: Send + Sync + fmt::Debug {
    /// Default model identifier used when a call does not name one.
    fn model(&self) -> &str;

    /// Provider name, for logging.
    fn provider(&self) -> &str {
        "openrouter"
    }

    /// Send `messages` and return the text of the first choice.
    async fn acall(
        &self,
        messages: Vec<LLMMessage>,
        options: CallOptions,
    ) -> Result<String, LLMError>;
}

// ---------------------------------------------------------------------------
// BaseLLMState - shared state for LLM implementations
// ---------------------------------------------------------------------------

/// Shared configuration that concrete providers embed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseLLMState {
    /// Default model identifier.
    pub model: String,
    /// Default sampling temperature.
    pub temperature: Option<f64>,
    /// Default completion budget.
    pub max_tokens: Option<u32>,
    /// Fallback API key.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL of the API, without the endpoint path.
    pub base_url: Option<String>,
}

impl BaseLLMState {
    /// Create state for `model` with the crate's sampling defaults.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: Some(DEFAULT_TEMPERATURE),
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            api_key: None,
            base_url: None,
        }
    }

    /// Resolve the effective API key for a call.
    pub fn resolve_api_key<'a>(&'a self, options: &'a CallOptions) -> Result<&'a str, LLMError> {
        let usable = |key: &&str| !key.trim().is_empty();
        options
            .api_key
            .as_deref()
            .filter(usable)
            .or_else(|| self.api_key.as_deref().filter(usable))
            .ok_or(LLMError::MissingApiKey)
    }
}
