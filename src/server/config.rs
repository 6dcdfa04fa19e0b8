//! Server configuration.
//!
//! Everything the server needs from its environment is read once at startup
//! into a [`ServerConfig`] and passed explicitly to the collaborators that
//! need it.
//!
//! # Environment Variables
//!
//! - `PORT` — HTTP port (default: 3001)
//! - `OPENROUTER_BASE_URL` — chat-completion API base (default: `https://openrouter.ai/api/v1`)
//! - `OPENROUTER_API_KEY` — fallback API key when a request carries no `X-API-Key`
//! - `DEFAULT_MODEL` — model used when a request names none
//! - `PRICE_API_URL` — token price endpoint
//! - `REQUEST_TIMEOUT_SECS` — timeout for outbound calls (default: 120)
//! - `MAX_UPLOAD_BYTES` — request body cap for document uploads (default: 10 MiB)
//! - `APP_REFERER`, `APP_TITLE` — OpenRouter attribution headers

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llms::providers::openrouter::DEFAULT_BASE_URL;
use crate::price::DEFAULT_PRICE_API_URL;

/// Default model for character generation.
pub const DEFAULT_MODEL: &str = "anthropic/claude-3.5-sonnet";

/// A configuration value could not be parsed.
#[derive(Debug, Error)]
#[error("Invalid value {value:?} for {key}: {reason}")]
pub struct ConfigError {
    pub key: String,
    pub value: String,
    pub reason: String,
}

/// Runtime configuration for the HTTP server and its collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub openrouter_base_url: String,
    #[serde(skip_serializing)]
    pub openrouter_api_key: Option<String>,
    pub default_model: String,
    pub price_api_url: String,
    pub request_timeout_secs: f64,
    pub max_upload_bytes: usize,
    pub app_referer: Option<String>,
    pub app_title: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            openrouter_base_url: DEFAULT_BASE_URL.to_string(),
            openrouter_api_key: None,
            default_model: DEFAULT_MODEL.to_string(),
            price_api_url: DEFAULT_PRICE_API_URL.to_string(),
            request_timeout_secs: 120.0,
            max_upload_bytes: 10 * 1024 * 1024,
            app_referer: None,
            app_title: Some("Character Generator".to_string()),
        }
    }
}

impl ServerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Unset or blank keys
    /// keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(port) = get("PORT") {
            config.port = parse("PORT", &port)?;
        }
        if let Some(url) = get("OPENROUTER_BASE_URL") {
            config.openrouter_base_url = url;
        }
        config.openrouter_api_key = get("OPENROUTER_API_KEY");
        if let Some(model) = get("DEFAULT_MODEL") {
            config.default_model = model;
        }
        if let Some(url) = get("PRICE_API_URL") {
            config.price_api_url = url;
        }
        if let Some(timeout) = get("REQUEST_TIMEOUT_SECS") {
            let secs: f64 = parse("REQUEST_TIMEOUT_SECS", &timeout)?;
            if !secs.is_finite() || secs <= 0.0 {
                return Err(ConfigError {
                    key: "REQUEST_TIMEOUT_SECS".to_string(),
                    value: timeout,
                    reason: "must be a positive number".to_string(),
                });
            }
            config.request_timeout_secs = secs;
        }
        if let Some(limit) = get("MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse("MAX_UPLOAD_BYTES", &limit)?;
        }
        if let Some(referer) = get("APP_REFERER") {
            config.app_referer = Some(referer);
        }
        if let Some(title) = get("APP_TITLE") {
            config.app_title = Some(title);
        }

        Ok(config)
    }

    /// Address to bind the listener to.
    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}
