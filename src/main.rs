//! QuestBot · Blockchain Learning Games Backend
//!
//! - Axum HTTP + WebSocket API
//! - Quiz and riddle games with adaptive complexity, fun facts, and timed
//!   creative-writing challenges
//! - Optional OpenAI-compatible text generation (via environment variables)
//!
//! Important env variables:
//!   PORT                : u16 (default 8000)
//!   OPENAI_API_KEY      : enables text generation if present
//!   OPENAI_BASE_URL     : default "https://api.openai.com/v1"
//!   OPENAI_FAST_MODEL   : default "gpt-4o-mini"
//!   OPENAI_STRONG_MODEL : default "gpt-4o"
//!   OPENAI_SEND_TOP_K   : "true" to forward top_k (non-OpenAI servers)
//!   LLM_TIMEOUT_SECS    : per-call timeout (default 20)
//!   SESSION_IDLE_MINUTES: evict game sessions idle this long (default 60)
//!   AGENT_CONFIG_PATH   : path to TOML config (prompts + sampling)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod error;
mod config;
mod llm;
mod normalize;
mod extract;
mod difficulty;
mod domain;
mod seeds;
mod verify;
mod breaks;
mod game;
mod session;
mod fun_facts;
mod creative;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::config::AppConfig;
use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let config = AppConfig::from_env();

  // Build shared application state (sessions, capability, prompts).
  let state = Arc::new(AppState::new(&config));

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "questbot_backend", %addr, llm = %state.capability_description(), "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
