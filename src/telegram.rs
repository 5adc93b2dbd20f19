//! Telegram Bot API relay for quiz feedback.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::error::ApiError;
use crate::util::to_iso;
use crate::validation::FeedbackPayload;

#[derive(Serialize)]
struct SendMessage<'a> {
  chat_id: &'a str,
  text: &'a str,
  disable_web_page_preview: bool,
}

#[derive(Clone)]
pub struct Telegram {
  client: reqwest::Client,
  api_base: String,
  bot_token: String,
  chat_id: String,
}

impl std::fmt::Debug for Telegram {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Telegram").field("api_base", &self.api_base).finish_non_exhaustive()
  }
}

impl Telegram {
  /// Needs both the bot token and the chat id; either missing means `None`.
  pub fn new(bot_token: Option<&str>, chat_id: Option<&str>, api_base: &str, timeout: Duration) -> Option<Self> {
    let bot_token = bot_token.map(str::trim).filter(|s| !s.is_empty())?.to_string();
    let chat_id = chat_id.map(str::trim).filter(|s| !s.is_empty())?.to_string();
    let client = match reqwest::Client::builder().timeout(timeout).build() {
      Ok(c) => c,
      Err(e) => {
        error!(target: "dualium_backend", error = %e, "Failed to build HTTP client for Telegram");
        return None;
      }
    };
    Some(Self { client, api_base: api_base.trim_end_matches('/').to_string(), bot_token, chat_id })
  }

  #[instrument(level = "info", skip(self, text), fields(text_len = text.len()))]
  pub async fn send_message(&self, text: &str) -> Result<(), ApiError> {
    let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
    let body = SendMessage { chat_id: &self.chat_id, text, disable_web_page_preview: true };

    let res = self
      .client
      .post(&url)
      .header(CONTENT_TYPE, "application/json")
      .json(&body)
      .send()
      .await
      .map_err(|e| ApiError::Internal(format!("telegram request failed: {}", e.without_url())))?;

    let status = res.status();
    let data: Value = res.json().await.unwrap_or(Value::Null);
    let ok = data.get("ok").and_then(Value::as_bool) == Some(true);
    if !status.is_success() || !ok {
      warn!(target: "dualium_backend", status = status.as_u16(), "Telegram rejected the message");
      return Err(ApiError::Delivery(format!("telegram status {}", status.as_u16())));
    }
    info!(target: "dualium_backend", "Feedback delivered");
    Ok(())
  }
}

/// The plain-text message posted to the feedback channel.
pub fn build_feedback_text(p: &FeedbackPayload) -> String {
  [
    "Dualium Quiz Feedback".to_string(),
    String::new(),
    format!("Name: {} {}", p.first_name, p.last_name),
    format!("Language: {}", p.lang.as_str().to_uppercase()),
    format!("Score: {}% ({}/{})", p.result.score_percent, p.result.correct_count, p.result.total),
    format!("Wrong Answers: {}", p.result.wrong_count),
    format!("Submitted At: {}", to_iso(&p.result.created_at)),
    String::new(),
    "Feedback:".to_string(),
    p.feedback.clone(),
  ]
  .join("\n")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Lang;
  use crate::util::parse_timestamp;
  use crate::validation::FeedbackResult;

  #[test]
  fn feedback_text_layout() {
    let p = FeedbackPayload {
      first_name: "Ana".into(),
      last_name: "Karimova".into(),
      feedback: "Loved the Stoicism questions.".into(),
      lang: Lang::Uz,
      result: FeedbackResult {
        score_percent: 87.5,
        correct_count: 7.0,
        total: 8.0,
        wrong_count: 1.0,
        created_at: parse_timestamp("2024-05-01T10:00:00Z").unwrap(),
      },
    };
    let text = build_feedback_text(&p);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Dualium Quiz Feedback");
    assert_eq!(lines[2], "Name: Ana Karimova");
    assert_eq!(lines[3], "Language: UZ");
    assert_eq!(lines[4], "Score: 87.5% (7/8)");
    assert_eq!(lines[5], "Wrong Answers: 1");
    assert_eq!(lines[6], "Submitted At: 2024-05-01T10:00:00.000Z");
    assert_eq!(lines[9], "Loved the Stoicism questions.");
  }

  #[test]
  fn needs_token_and_chat() {
    let t = Duration::from_secs(1);
    assert!(Telegram::new(Some("tok"), None, "https://api.telegram.org", t).is_none());
    assert!(Telegram::new(None, Some("1"), "https://api.telegram.org", t).is_none());
    assert!(Telegram::new(Some("tok"), Some("1"), "https://api.telegram.org", t).is_some());
  }

  #[test]
  fn blank_credentials_and_trailing_slash() {
    let t = Duration::from_secs(1);
    assert!(Telegram::new(Some("  "), Some("1"), "https://api.telegram.org", t).is_none());
    let relay = Telegram::new(Some(" tok "), Some(" 42 "), "http://127.0.0.1:9/", t).unwrap();
    assert_eq!(relay.api_base, "http://127.0.0.1:9");
    assert_eq!(relay.bot_token, "tok");
    assert_eq!(relay.chat_id, "42");
  }
}
