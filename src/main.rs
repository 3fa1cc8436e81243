//! SkillStream · Course Marketplace Backend
//!
//! - Axum HTTP API for profiles, the course catalog, enrollments and quizzes
//! - Learning assistant over HTTP + WebSocket (OpenAI-compatible, optional)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                     : u16 (default 3000)
//!   SKILLSTREAM_CONFIG_PATH  : path to TOML config (prompts + catalog settings)
//!   OPENAI_API_KEY           : enables the assistant if present
//!   OPENAI_BASE_URL          : default "https://api.openai.com/v1"
//!   OPENAI_MODEL             : default "gpt-4o-mini"
//!   IDENTITY_API_KEY         : enables the remote identity provider; in-memory otherwise
//!   IDENTITY_BASE_URL        : default "https://identitytoolkit.googleapis.com/v1"
//!   LOG_LEVEL                : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT               : "pretty" (default) or "json"

mod telemetry;
mod util;
mod error;
mod domain;
mod config;
mod profile;
mod catalog;
mod ledger;
mod quiz;
mod identity;
mod session;
mod state;
mod protocol;
mod assistant;
mod logic;
mod openai;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared application state (collections, identity provider, assistant client, config).
  let state = Arc::new(AppState::new());

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "skillstream", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "skillstream", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "skillstream", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "skillstream", "Shutdown signal received");
}
