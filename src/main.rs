//! Dualium · Philosophy Quiz Backend
//!
//! - Axum JSON API under `/api`
//! - Optional chat upstream (Groq, OpenAI-compatible) and Telegram feedback relay
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   GROQ_API_KEY        : enables chat and tutor endpoints
//!   GROQ_BASE_URL       : default "https://api.groq.com/openai/v1"
//!   GROQ_DEFAULT_MODEL  : default "llama-3.3-70b-versatile"
//!   TELEGRAM_BOT_TOKEN  : together with TELEGRAM_CHAT_ID enables feedback delivery
//!   APP_CONFIG_PATH     : TOML file with [limits] and [prompts]
//!   CONTENT_PATH        : TOML file replacing the built-in content
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use dualium_backend::config::AppConfig;
use dualium_backend::{build_router, telemetry, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let config = AppConfig::from_env();
  let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

  let state = Arc::new(AppState::new(config));
  let app = build_router(state);

  let listener = TcpListener::bind(addr).await?;
  info!(target: "dualium_backend", %addr, "HTTP server listening");
  // Connect info feeds the client-IP fallback used by the rate limiters.
  axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
  Ok(())
}
