//! Runtime configuration: environment variables plus an optional TOML file.
//!
//! The TOML file (`APP_CONFIG_PATH`) tunes limits and tutor prompts; see `FileConfig`.
//! Credentials only ever come from the environment.

use serde::Deserialize;
use tracing::{error, info};

use crate::ratelimit::LimiterSettings;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FileConfig {
  #[serde(default)]
  pub limits: Limits,
  #[serde(default)]
  pub prompts: Prompts,
}

/// Throttle windows, memory bounds and the upstream deadline.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Limits {
  pub chat_window_ms: u64,
  pub feedback_window_ms: u64,
  pub leaderboard_window_ms: u64,
  pub sweep_threshold: usize,
  pub stale_ms: u64,
  pub leaderboard_capacity: usize,
  pub upstream_timeout_ms: u64,
}

impl Default for Limits {
  fn default() -> Self {
    Self {
      chat_window_ms: 1_500,
      feedback_window_ms: 2_000,
      leaderboard_window_ms: 1_200,
      sweep_threshold: 5_000,
      stale_ms: 60_000,
      leaderboard_capacity: 200,
      upstream_timeout_ms: 20_000,
    }
  }
}

impl Limits {
  pub fn limiter(&self, window_ms: u64) -> LimiterSettings {
    LimiterSettings { window_ms, sweep_threshold: self.sweep_threshold, stale_ms: self.stale_ms }
  }
}

/// Tutor prompts. `tutor_user_template` takes `{context}` and `{question}`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub tutor_system_en: String,
  pub tutor_system_uz: String,
  pub tutor_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      tutor_system_en: [
        "You are Dualium Tutor.",
        "Prioritize the provided CONTEXT first.",
        "If context is not enough, answer using reliable general knowledge.",
        "If the question is outside Dualium topics, still provide a brief helpful answer.",
        "If the user sends a simple greeting/thanks, reply politely and briefly.",
        "Do not fabricate facts. If confidence is low, say so clearly.",
        "Use a natural, clear, human conversational tone.",
        "For quiz explanations, use bullet points and end with exactly 1 short tip.",
        "Keep responses concise.",
      ]
      .join("\n"),
      tutor_system_uz: [
        "Sen Dualium tutorisan.",
        "Javob berishda avval berilgan CONTEXTni ustuvor ishlat.",
        "Agar context yetarli bo`lmasa, aniq va ishonchli umumiy bilimdan foydalan.",
        "Foydalanuvchi savoli Dualium mavzusidan tashqarida bo`lsa ham qisqa va foydali javob ber.",
        "Agar savol oddiy salomlashuv yoki minnatdorchilik bo`lsa, muloyim va qisqa javob ber.",
        "Noto`g`ri ma`lumot o`ylab topma. Ishonching past bo`lsa, aniq qilib ayt.",
        "Javob aniq, sodda va odatiy tabiiy uslubda bo`lsin.",
        "Quiz izohlarida punktlar bilan yoz va oxirida aynan 1 ta qisqa tip ber.",
        "Javobni ortiqcha cho`zma.",
      ]
      .join("\n"),
      tutor_user_template: "CONTEXT:\n{context}\n\nQUESTION:\n{question}".into(),
    }
  }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
  pub port: u16,
  pub groq_api_key: Option<String>,
  pub groq_base_url: String,
  pub groq_default_model: String,
  pub telegram_bot_token: Option<String>,
  pub telegram_chat_id: Option<String>,
  pub telegram_api_base: String,
  pub content_path: Option<String>,
  pub limits: Limits,
  pub prompts: Prompts,
}

impl Default for AppConfig {
  /// No credentials, built-in content, default limits.
  fn default() -> Self {
    Self {
      port: DEFAULT_PORT,
      groq_api_key: None,
      groq_base_url: DEFAULT_GROQ_BASE_URL.into(),
      groq_default_model: DEFAULT_GROQ_MODEL.into(),
      telegram_bot_token: None,
      telegram_chat_id: None,
      telegram_api_base: DEFAULT_TELEGRAM_API_BASE.into(),
      content_path: None,
      limits: Limits::default(),
      prompts: Prompts::default(),
    }
  }
}

fn env_opt(key: &str) -> Option<String> {
  std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AppConfig {
  pub fn from_env() -> Self {
    let file = env_opt("APP_CONFIG_PATH").and_then(|p| load_file_config(&p)).unwrap_or_default();
    Self {
      port: env_opt("PORT").and_then(|p| p.parse().ok()).unwrap_or(DEFAULT_PORT),
      groq_api_key: env_opt("GROQ_API_KEY"),
      groq_base_url: env_opt("GROQ_BASE_URL").unwrap_or_else(|| DEFAULT_GROQ_BASE_URL.into()),
      groq_default_model: env_opt("GROQ_DEFAULT_MODEL").unwrap_or_else(|| DEFAULT_GROQ_MODEL.into()),
      telegram_bot_token: env_opt("TELEGRAM_BOT_TOKEN"),
      telegram_chat_id: env_opt("TELEGRAM_CHAT_ID"),
      telegram_api_base: env_opt("TELEGRAM_API_BASE").unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.into()),
      content_path: env_opt("CONTENT_PATH"),
      limits: file.limits,
      prompts: file.prompts,
    }
  }
}

pub fn parse_file_config(raw: &str) -> Result<FileConfig, toml::de::Error> {
  toml::from_str(raw)
}

/// Read and parse the TOML file; any error is logged and yields `None`.
pub fn load_file_config(path: &str) -> Option<FileConfig> {
  match std::fs::read_to_string(path) {
    Ok(s) => match parse_file_config(&s) {
      Ok(cfg) => {
        info!(target: "dualium_backend", %path, "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "dualium_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "dualium_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_file_keeps_defaults() {
    let cfg = parse_file_config(
      r#"
        [limits]
        chat_window_ms = 500

        [prompts]
        tutor_user_template = "Q: {question}"
      "#,
    )
    .unwrap();
    assert_eq!(cfg.limits.chat_window_ms, 500);
    assert_eq!(cfg.limits.feedback_window_ms, 2_000);
    assert_eq!(cfg.prompts.tutor_user_template, "Q: {question}");
    assert!(cfg.prompts.tutor_system_en.starts_with("You are Dualium Tutor."));
  }

  #[test]
  fn empty_file_is_all_defaults() {
    let cfg = parse_file_config("").unwrap();
    assert_eq!(cfg.limits, Limits::default());
  }

  #[test]
  fn limiter_settings_from_limits() {
    let s = Limits::default().limiter(1_200);
    assert_eq!((s.window_ms, s.sweep_threshold, s.stale_ms), (1_200, 5_000, 60_000));
  }

  #[test]
  fn default_config_has_no_credentials() {
    let cfg = AppConfig::default();
    assert!(cfg.groq_api_key.is_none() && cfg.telegram_bot_token.is_none());
    assert_eq!(cfg.groq_base_url, DEFAULT_GROQ_BASE_URL);
  }

  #[test]
  fn unreadable_file_is_none() {
    assert!(load_file_config("/no/such/config.toml").is_none());
  }
}
