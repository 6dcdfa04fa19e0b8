//! HTTP server for the character generator.
//!
//! # Endpoints
//!
//! - `GET  /health`                 — Liveness probe
//! - `POST /api/generate-character` — Generate a character from a description
//! - `POST /api/refine-character`   — Refine an existing character
//! - `POST /api/fix-json`           — Repair pasted JSON without calling the model
//! - `POST /api/process-files`      — Turn uploaded text documents into knowledge
//! - `GET  /api/token-price`        — Proxy to the token price API

pub mod config;
pub mod error;
pub mod routes;

pub use config::ServerConfig;
pub use error::ApiError;
pub use routes::{app_router, AppState};
