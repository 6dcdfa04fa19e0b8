//! Axum route handlers for the character generator HTTP server.
//!
//! # Routes
//!
//! - `GET  /health`                 — Returns `{"status": "ok", "version": ..., "service": ...}`
//! - `POST /api/generate-character` — Accepts `GenerateRequest`, returns `CharacterResponse`
//! - `POST /api/refine-character`   — Accepts `RefineRequest`, returns `CharacterResponse`
//! - `POST /api/fix-json`           — Accepts `{content}`, returns `{character}`
//! - `POST /api/process-files`      — Multipart `files` parts, returns `{knowledge}`
//! - `GET  /api/token-price?ids=`   — Upstream price JSON passed through

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::character::pipeline::{
    fix_json, CharacterPipeline, CharacterResponse, GenerateRequest, RefineRequest,
};
use crate::knowledge::{collect_knowledge, BaseKnowledgeSource, UploadedDocumentSource};
use crate::llms::base_llm::BaseLLM;
use crate::llms::providers::openrouter::OpenRouterCompletion;
use crate::price::PriceClient;
use crate::server::config::ServerConfig;
use crate::server::error::ApiError;

/// Header carrying a per-request OpenRouter key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: CharacterPipeline,
    pub prices: PriceClient,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Build the production collaborators from configuration.
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let llm = OpenRouterCompletion::new(
            config.default_model.clone(),
            config.openrouter_api_key.clone(),
            Some(config.openrouter_base_url.clone()),
            config.request_timeout_secs,
        )?
        .with_attribution(config.app_referer.clone(), config.app_title.clone());
        let prices = PriceClient::new(config.price_api_url.clone(), config.request_timeout_secs)?;
        Ok(Self::from_parts(Arc::new(llm), prices, config))
    }

    /// Assemble state from an arbitrary chat backend.
    pub fn from_parts(llm: Arc<dyn BaseLLM>, prices: PriceClient, config: ServerConfig) -> Self {
        Self {
            pipeline: CharacterPipeline::new(llm),
            prices,
            config: Arc::new(config),
        }
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/generate-character", post(generate_handler))
        .route("/api/refine-character", post(refine_handler))
        .route("/api/fix-json", post(fix_json_handler))
        .route("/api/process-files", post(process_files_handler))
        .route("/api/token-price", get(token_price_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health — liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "character-generator",
    }))
}

/// POST /api/generate-character
async fn generate_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<CharacterResponse>, ApiError> {
    let Json(request) = body.map_err(bad_json)?;
    let response = state
        .pipeline
        .generate(request, request_api_key(&headers))
        .await?;
    Ok(Json(response))
}

/// POST /api/refine-character
async fn refine_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RefineRequest>, JsonRejection>,
) -> Result<Json<CharacterResponse>, ApiError> {
    let Json(request) = body.map_err(bad_json)?;
    let response = state
        .pipeline
        .refine(request, request_api_key(&headers))
        .await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct FixJsonRequest {
    #[serde(default)]
    content: String,
}

/// POST /api/fix-json — normalize pasted text, no model call.
async fn fix_json_handler(
    body: Result<Json<FixJsonRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = body.map_err(bad_json)?;
    let character = fix_json(&request.content)?;
    Ok(Json(serde_json::json!({ "character": character })))
}

/// POST /api/process-files — split uploaded text documents into knowledge
/// sentences, concatenated in upload order.
async fn process_files_handler(mut multipart: Multipart) -> Result<Json<Value>, ApiError> {
    let mut sources: Vec<Box<dyn BaseKnowledgeSource>> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("files") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.txt").to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        sources.push(Box::new(UploadedDocumentSource::new(file_name, bytes.to_vec())));
    }

    if sources.is_empty() {
        return Err(ApiError::BadRequest("No files uploaded".to_string()));
    }

    let knowledge =
        collect_knowledge(&sources).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    tracing::info!(
        files = sources.len(),
        sentences = knowledge.len(),
        "processed uploaded documents"
    );
    Ok(Json(serde_json::json!({ "knowledge": knowledge })))
}

#[derive(Debug, Deserialize)]
struct PriceQuery {
    #[serde(default)]
    ids: String,
}

/// GET /api/token-price — forward to the price API.
async fn token_price_handler(
    State(state): State<AppState>,
    Query(query): Query<PriceQuery>,
) -> Result<Json<Value>, ApiError> {
    let prices = state.prices.fetch_prices(&query.ids).await?;
    Ok(Json(prices))
}

/// Per-request key from the `X-API-Key` header. The provider falls back to
/// the configured key when this is `None`.
fn request_api_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn bad_json(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("Uploaded files exceed the size limit".to_string())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
