//! HTTP error mapping.
//!
//! Every failure leaves the server as `{"error": "<message>"}` with a status
//! code chosen by the failure's origin. No machine-readable code is defined
//! beyond the HTTP status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::character::PipelineError;
use crate::llms::base_llm::LLMError;
use crate::price::PriceError;

/// An error ready to be returned from a handler.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// The model's output could not be turned into a character.
    #[error("{0}")]
    Unprocessable(String),

    /// An upstream API failed.
    #[error("{0}")]
    BadGateway(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "request failed");
        } else {
            tracing::warn!(status = %status, error = %self, "request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidRequest(message) => ApiError::BadRequest(message),
            PipelineError::Llm(LLMError::MissingApiKey) => {
                ApiError::Unauthorized(LLMError::MissingApiKey.to_string())
            }
            PipelineError::Llm(e) => ApiError::BadGateway(e.to_string()),
            PipelineError::Json(e) => ApiError::Unprocessable(e.to_string()),
            PipelineError::Schema(e) => ApiError::Unprocessable(e.to_string()),
        }
    }
}

impl From<PriceError> for ApiError {
    fn from(err: PriceError) -> Self {
        match err {
            PriceError::MissingIds => ApiError::BadRequest(err.to_string()),
            other => ApiError::BadGateway(other.to_string()),
        }
    }
}
