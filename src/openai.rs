//! Minimal OpenAI-compatible chat-completions client (pointed at Groq by default).
//!
//! The chat endpoint is a relay: the upstream JSON body is returned verbatim on
//! success. Calls log model, latency and sizes, never the key or message text.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, instrument};

use crate::error::ApiError;

const UPSTREAM_NAME: &str = "Groq";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
  System,
  User,
  Assistant,
}

impl ChatRole {
  pub fn parse(raw: &str) -> Option<Self> {
    match raw {
      "system" => Some(ChatRole::System),
      "user" => Some(ChatRole::User),
      "assistant" => Some(ChatRole::Assistant),
      _ => None,
    }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatMessage {
  pub role: ChatRole,
  pub content: String,
}

impl ChatMessage {
  pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
    Self { role, content: content.into() }
  }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  temperature: f64,
  messages: &'a [ChatMessage],
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  api_key: String,
  pub base_url: String,
}

impl std::fmt::Debug for OpenAI {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OpenAI").field("base_url", &self.base_url).finish_non_exhaustive()
  }
}

impl OpenAI {
  /// `None` when no key is configured; the chat endpoints then answer with a configuration error.
  pub fn new(api_key: Option<&str>, base_url: &str, timeout: Duration) -> Option<Self> {
    let api_key = api_key.map(str::trim).filter(|k| !k.is_empty())?.to_string();
    let client = match reqwest::Client::builder().timeout(timeout).build() {
      Ok(c) => c,
      Err(e) => {
        error!(target: "dualium_backend", error = %e, "Failed to build HTTP client for chat upstream");
        return None;
      }
    };
    Some(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string() })
  }

  /// POST `/chat/completions`; the upstream JSON body on 2xx.
  #[instrument(level = "info", skip(self, messages), fields(%model, messages = messages.len()))]
  pub async fn chat_completion(&self, model: &str, temperature: f64, messages: &[ChatMessage]) -> Result<Value, ApiError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest { model, temperature, messages };
    let started = Instant::now();

    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "dualium-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req)
      .send()
      .await
      .map_err(transport_error)?;

    let status = res.status();
    let bytes = res.bytes().await.map_err(transport_error)?;
    // A non-JSON body is treated as an empty object, like a failed `json()` on the client side.
    let data: Value = serde_json::from_slice(&bytes).unwrap_or_else(|_| json!({}));
    let total_tokens = data.pointer("/usage/total_tokens").and_then(|v| v.as_u64());

    info!(
      target: "dualium_backend",
      status = status.as_u16(),
      latency_ms = started.elapsed().as_millis() as u64,
      body_bytes = bytes.len(),
      total_tokens = ?total_tokens,
      "Chat upstream responded"
    );

    if !status.is_success() {
      let message = upstream_error_message(&data).unwrap_or_else(|| format!("{} upstream error", UPSTREAM_NAME));
      return Err(ApiError::Upstream { message, status: status.as_u16() });
    }
    Ok(data)
  }
}

fn transport_error(e: reqwest::Error) -> ApiError {
  if e.is_timeout() {
    ApiError::Timeout(UPSTREAM_NAME.to_string())
  } else {
    ApiError::Internal(format!("chat upstream request failed: {}", e))
  }
}

/// `error.message` from an OpenAI-style error body, when present and non-blank.
pub fn upstream_error_message(body: &Value) -> Option<String> {
  body
    .pointer("/error/message")
    .and_then(Value::as_str)
    .filter(|m| !m.trim().is_empty())
    .map(str::to_string)
}

/// Trimmed text of the first choice, if any.
pub fn completion_text(body: &Value) -> Option<String> {
  body
    .pointer("/choices/0/message/content")
    .and_then(Value::as_str)
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn roles_parse_and_serialize() {
    assert_eq!(ChatRole::parse("assistant"), Some(ChatRole::Assistant));
    assert_eq!(ChatRole::parse("Tool"), None);
    let v = serde_json::to_value(ChatMessage::new(ChatRole::System, "x")).unwrap();
    assert_eq!(v, json!({"role": "system", "content": "x"}));
  }

  #[test]
  fn error_message_extraction() {
    assert_eq!(
      upstream_error_message(&json!({"error": {"message": "Invalid API Key"}})).as_deref(),
      Some("Invalid API Key")
    );
    assert_eq!(upstream_error_message(&json!({"error": {"message": "  "}})), None);
    assert_eq!(upstream_error_message(&json!({})), None);
  }

  #[test]
  fn completion_text_extraction() {
    let body = json!({"choices": [{"message": {"content": "  Ataraxia is calm.  "}}]});
    assert_eq!(completion_text(&body).as_deref(), Some("Ataraxia is calm."));
    assert_eq!(completion_text(&json!({"choices": []})), None);
  }

  #[test]
  fn client_requires_key() {
    assert!(OpenAI::new(None, "https://example.invalid", Duration::from_secs(1)).is_none());
    assert!(OpenAI::new(Some("  "), "https://example.invalid", Duration::from_secs(1)).is_none());
    let c = OpenAI::new(Some("k"), "https://example.invalid/v1/", Duration::from_secs(1)).unwrap();
    assert_eq!(c.base_url, "https://example.invalid/v1");
  }
}
