//! Application state shared by every handler.
//!
//! Owns:
//!   - the content index (read-only after startup)
//!   - the leaderboard store
//!   - one rate limiter per throttled endpoint
//!   - the optional chat and feedback upstream clients
//!
//! Mutable parts sit behind `tokio::sync::Mutex`; no lock is held across an await.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::content::{load_content, ContentIndex};
use crate::leaderboard::Leaderboard;
use crate::openai::OpenAI;
use crate::ratelimit::RateLimiter;
use crate::telegram::Telegram;

pub struct AppState {
    pub config: AppConfig,
    pub content: Arc<ContentIndex>,
    pub leaderboard: Mutex<Leaderboard>,
    pub chat_limiter: Mutex<RateLimiter>,
    pub feedback_limiter: Mutex<RateLimiter>,
    pub leaderboard_limiter: Mutex<RateLimiter>,
    pub openai: Option<OpenAI>,
    pub telegram: Option<Telegram>,
}

impl AppState {
    /// Build state from config: load content, size the stores, init upstream clients.
    #[instrument(level = "info", skip_all)]
    pub fn new(config: AppConfig) -> Self {
        let content = load_content(config.content_path.as_deref());
        Self::with_content(config, content)
    }

    pub fn with_content(config: AppConfig, content: ContentIndex) -> Self {
        let limits = &config.limits;
        let timeout = Duration::from_millis(limits.upstream_timeout_ms);

        info!(
            target: "dualium_backend",
            articles = content.articles().len(),
            philosophers = content.philosophers().len(),
            concepts = content.concepts().len(),
            "Content index ready"
        );

        let openai = OpenAI::new(config.groq_api_key.as_deref(), &config.groq_base_url, timeout);
        if let Some(oa) = &openai {
            info!(target: "dualium_backend", base_url = %oa.base_url, model = %config.groq_default_model, "Chat upstream enabled.");
        } else {
            warn!(target: "dualium_backend", "Chat upstream disabled (no GROQ_API_KEY). Chat and tutor requests will fail.");
        }

        let telegram = Telegram::new(
            config.telegram_bot_token.as_deref(),
            config.telegram_chat_id.as_deref(),
            &config.telegram_api_base,
            timeout,
        );
        if telegram.is_some() {
            info!(target: "dualium_backend", "Feedback relay enabled.");
        } else {
            warn!(target: "dualium_backend", "Feedback relay disabled (TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID missing).");
        }

        Self {
            leaderboard: Mutex::new(Leaderboard::new(limits.leaderboard_capacity)),
            chat_limiter: Mutex::new(RateLimiter::new("chat", limits.limiter(limits.chat_window_ms))),
            feedback_limiter: Mutex::new(RateLimiter::new("feedback", limits.limiter(limits.feedback_window_ms))),
            leaderboard_limiter: Mutex::new(RateLimiter::new(
                "leaderboard",
                limits.limiter(limits.leaderboard_window_ms),
            )),
            content: Arc::new(content),
            openai,
            telegram,
            config,
        }
    }
}

/// Wall clock in epoch milliseconds, the unit the limiters work in.
pub fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}
