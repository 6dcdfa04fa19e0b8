//! Token price lookup proxy.
//!
//! Forwards `ids` lookups to a configured price API and hands the JSON back
//! untouched. The front-end uses this to avoid calling the price API from
//! the browser.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Default price API endpoint.
pub const DEFAULT_PRICE_API_URL: &str = "https://api.jup.ag/price/v2";

/// Errors from the price API.
#[derive(Debug, Error)]
pub enum PriceError {
    #[error("No token ids supplied")]
    MissingIds,

    #[error("Price request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Price API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Invalid price response: {0}")]
    InvalidResponse(String),
}

/// Thin client for the price API.
#[derive(Debug, Clone)]
pub struct PriceClient {
    base_url: String,
    client: reqwest::Client,
}

impl PriceClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: f64) -> Result<Self, PriceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs_f64(timeout_secs))
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch prices for a comma-separated list of token ids.
    pub async fn fetch_prices(&self, ids: &str) -> Result<Value, PriceError> {
        let ids = ids.trim();
        if ids.is_empty() {
            return Err(PriceError::MissingIds);
        }

        log::debug!("Fetching token prices for {}", ids);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("ids", ids)])
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(PriceError::Status {
                status: status.as_u16(),
                body: text.chars().take(500).collect(),
            });
        }

        serde_json::from_str(&text).map_err(|e| PriceError::InvalidResponse(e.to_string()))
    }
}
