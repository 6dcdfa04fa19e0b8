//! Character generator HTTP server binary.
//!
//! Starts an axum HTTP server that proxies character generation to
//! OpenRouter and token price lookups to the price API.
//!
//! Configuration is read from the environment (and a `.env` file when
//! present); see [`character_generator::server::config`] for the keys.
//! `RUST_LOG` sets the tracing filter (default: "info,character_generator=debug").
//!
//! # Usage
//!
//! ```bash
//! OPENROUTER_API_KEY=sk-or-... cargo run --bin server
//! ```

use anyhow::Context;
use character_generator::server::{app_router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,character_generator=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let bind_addr = config.bind_addr();
    if config.openrouter_api_key.is_none() {
        tracing::warn!("OPENROUTER_API_KEY not set; requests must carry an X-API-Key header");
    }

    let state = AppState::new(config)?;
    let app = app_router(state);

    tracing::info!("character generator starting on {}", bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                 — liveness probe");
    tracing::info!("  POST /api/generate-character — new character from a description");
    tracing::info!("  POST /api/refine-character   — rewrite an existing character");
    tracing::info!("  POST /api/fix-json           — repair pasted JSON");
    tracing::info!("  POST /api/process-files      — documents to knowledge");
    tracing::info!("  GET  /api/token-price        — token price proxy");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    axum::serve(listener, app).await.context("Server failed")?;
    Ok(())
}
