//! OpenRouter chat-completion provider.
//!
//! OpenRouter speaks the OpenAI Chat Completions wire format, so the request
//! body is `{model, messages, temperature, max_tokens}` and the completion
//! text is read from `choices[0].message.content`. OpenRouter additionally
//! accepts `HTTP-Referer` and `X-Title` headers for app attribution.
//!
//! There is no retry loop here: a failed call surfaces immediately to the
//! caller.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::llms::base_llm::{BaseLLM, BaseLLMState, CallOptions, LLMError, LLMMessage};

/// Default OpenRouter API base URL.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// OpenRouter completion provider.
///
/// # Example
///
/// ```ignore
/// let provider = OpenRouterCompletion::new("anthropic/claude-3.5-sonnet", None, None, 120.0)?;
/// let text = provider.acall(messages, CallOptions::default()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct OpenRouterCompletion {
    /// Shared base LLM state.
    pub state: BaseLLMState,
    /// Sent as `HTTP-Referer`.
    pub referer: Option<String>,
    /// Sent as `X-Title`.
    pub title: Option<String>,
    client: reqwest::Client,
}

impl OpenRouterCompletion {
    /// Create a new provider.
    ///
    /// # Arguments
    ///
    /// * `model` - Default model identifier.
    /// * `api_key` - Fallback key when a call does not carry its own.
    /// * `base_url` - API base URL; defaults to [`DEFAULT_BASE_URL`].
    /// * `timeout_secs` - Whole-request timeout.
    pub fn new(
        model: impl Into<String>,
        api_key: Option<String>,
        base_url: Option<String>,
        timeout_secs: f64,
    ) -> Result<Self, LLMError> {
        let mut state = BaseLLMState::new(model);
        state.api_key = api_key;
        state.base_url = base_url;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs_f64(timeout_secs))
            .build()?;

        Ok(Self {
            state,
            referer: None,
            title: None,
            client,
        })
    }

    /// Set the attribution headers.
    pub fn with_attribution(mut self, referer: Option<String>, title: Option<String>) -> Self {
        self.referer = referer;
        self.title = title;
        self
    }

    /// Get the API base URL.
    pub fn api_base_url(&self) -> String {
        self.state
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Build the request body for the Chat Completions endpoint.
    pub fn build_request_body(&self, messages: &[LLMMessage], options: &CallOptions) -> Value {
        let model = options.model.as_deref().unwrap_or(&self.state.model);
        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
        });

        if let Some(temp) = options.temperature.or(self.state.temperature) {
            body["temperature"] = serde_json::json!(temp);
        }
        if let Some(max_tokens) = options.max_tokens.or(self.state.max_tokens) {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }

    /// Extract the completion text from a Chat Completions response.
    pub fn parse_completions_response(&self, response: &Value) -> Result<String, LLMError> {
        // OpenRouter reports some upstream failures as a 200 with an error body.
        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| error.to_string());
            return Err(LLMError::InvalidResponse(message));
        }

        let message = response
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|choice| choice.get("message"))
            .ok_or_else(|| LLMError::InvalidResponse("No choices in response".to_string()))?;

        let content = message
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| LLMError::InvalidResponse("No message content in response".to_string()))?;

        if let Some(usage) = response.get("usage") {
            log::debug!(
                "OpenRouter token usage: prompt={}, completion={}, total={}",
                usage.get("prompt_tokens").and_then(Value::as_i64).unwrap_or(0),
                usage.get("completion_tokens").and_then(Value::as_i64).unwrap_or(0),
                usage.get("total_tokens").and_then(Value::as_i64).unwrap_or(0),
            );
        }

        Ok(content.to_string())
    }
}

#[async_trait]
impl BaseLLM for OpenRouterCompletion {
    fn model(&self) -> &str {
        &self.state.model
    }

    async fn acall(
        &self,
        messages: Vec<LLMMessage>,
        options: CallOptions,
    ) -> Result<String, LLMError> {
        let api_key = self.state.resolve_api_key(&options)?;
        let body = self.build_request_body(&messages, &options);
        let endpoint = format!("{}/chat/completions", self.api_base_url());

        log::debug!(
            "OpenRouterCompletion.acall: model={}, messages={}",
            body["model"],
            messages.len(),
        );

        let mut request = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", api_key));

        if let Some(ref referer) = self.referer {
            request = request.header("HTTP-Referer", referer);
        }
        if let Some(ref title) = self.title {
            request = request.header("X-Title", title);
        }

        let response = request.json(&body).send().await?;
        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            log::warn!("OpenRouter API returned {}", status);
            return Err(LLMError::Status {
                status: status.as_u16(),
                body: truncate(&response_text, 500),
            });
        }

        let response_json: Value = serde_json::from_str(&response_text).map_err(|e| {
            LLMError::InvalidResponse(format!(
                "{} - Body: {}",
                e,
                truncate(&response_text, 500)
            ))
        })?;

        self.parse_completions_response(&response_json)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
