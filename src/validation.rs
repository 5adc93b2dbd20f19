//! Request body parsing and per-endpoint payload validation.
//!
//! Every check runs before any state mutation or outbound call. Failures carry a
//! single message naming the violated constraint and map to HTTP 400.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::domain::Lang;
use crate::error::ValidationError;
use crate::leaderboard::{name_key, normalize_name, LeaderboardEntry};
use crate::openai::{ChatMessage, ChatRole};
use crate::util::{finite_number, parse_timestamp};

pub const MAX_CHAT_BODY_CHARS: usize = 200_000;
pub const MAX_LEADERBOARD_BODY_CHARS: usize = 6_000;
pub const MAX_FEEDBACK_BODY_CHARS: usize = 20_000;
pub const MAX_QUIZ_BODY_CHARS: usize = 500_000;

const MAX_MESSAGES: usize = 30;
const MAX_MESSAGE_CHARS: usize = 12_000;
const MAX_TOTAL_MESSAGE_CHARS: usize = 80_000;
const MAX_MODEL_CHARS: usize = 80;
const DEFAULT_TEMPERATURE: f64 = 0.3;

const MAX_PERSON_NAME: usize = 80;
const MIN_FEEDBACK: usize = 5;
const MAX_FEEDBACK: usize = 1_500;

const MIN_PLAYER_NAME: usize = 2;
const MAX_PLAYER_NAME: usize = 80;
const MAX_TOTAL_QUESTIONS: f64 = 200.0;
const MIN_ELAPSED_MS: f64 = 1_000.0;
const MAX_ELAPSED_MS: f64 = 21_600_000.0;

pub const DEFAULT_LIMIT: usize = 5;
const MAX_LIMIT: f64 = 20.0;

static MODEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._:-]+$").expect("model pattern compiles"));

fn char_len(s: &str) -> usize {
  s.chars().count()
}

/// Parse a raw body that must be one UTF-8 JSON object of at most `max_chars` characters.
pub fn parse_json_object(raw: &[u8], max_chars: usize) -> Result<Map<String, Value>, ValidationError> {
  let raw = std::str::from_utf8(raw).map_err(|_| ValidationError::new("invalid JSON body"))?;
  if char_len(raw) > max_chars {
    return Err(ValidationError::new(format!("request body exceeds {} characters", max_chars)));
  }
  match serde_json::from_str::<Value>(raw) {
    Ok(Value::Object(map)) => Ok(map),
    Ok(_) => Err(ValidationError::new("request body must be a JSON object")),
    Err(_) => Err(ValidationError::new("invalid JSON body")),
  }
}

// ---------------------------------------------------------------- chat

#[derive(Clone, Debug, PartialEq)]
pub struct ChatRequest {
  pub messages: Vec<ChatMessage>,
  pub model: String,
  pub temperature: f64,
}

pub fn validate_messages(value: Option<&Value>) -> Result<Vec<ChatMessage>, ValidationError> {
  let items = match value {
    Some(Value::Array(items)) => items,
    _ => return Err(ValidationError::new("messages must be an array")),
  };
  if items.is_empty() || items.len() > MAX_MESSAGES {
    return Err(ValidationError::new(format!("messages length must be between 1 and {}", MAX_MESSAGES)));
  }

  let mut total = 0usize;
  let mut out = Vec::with_capacity(items.len());
  for item in items {
    let obj = item
      .as_object()
      .ok_or_else(|| ValidationError::new("each message must be an object"))?;
    let role = obj
      .get("role")
      .and_then(Value::as_str)
      .and_then(ChatRole::parse)
      .ok_or_else(|| ValidationError::new("message role must be system, user, or assistant"))?;
    let content = obj
      .get("content")
      .and_then(Value::as_str)
      .ok_or_else(|| ValidationError::new("message content must be a string"))?;

    let trimmed = char_len(content.trim());
    if trimmed == 0 || trimmed > MAX_MESSAGE_CHARS {
      return Err(ValidationError::new(format!(
        "message content length must be between 1 and {}",
        MAX_MESSAGE_CHARS
      )));
    }
    total += trimmed;
    if total > MAX_TOTAL_MESSAGE_CHARS {
      return Err(ValidationError::new(format!(
        "total message content exceeds {} characters",
        MAX_TOTAL_MESSAGE_CHARS
      )));
    }
    out.push(ChatMessage { role, content: content.to_string() });
  }
  Ok(out)
}

/// Absent or blank picks `default_model`; anything else must be a short model identifier.
pub fn validate_model(value: Option<&Value>, default_model: &str) -> Result<String, ValidationError> {
  let raw = match value {
    None => return Ok(default_model.to_string()),
    Some(Value::String(s)) => s.trim(),
    Some(_) => return Err(ValidationError::new("model must be a string")),
  };
  if raw.is_empty() {
    return Ok(default_model.to_string());
  }
  if char_len(raw) > MAX_MODEL_CHARS || !MODEL_RE.is_match(raw) {
    return Err(ValidationError::new("model format is invalid"));
  }
  Ok(raw.to_string())
}

pub fn validate_temperature(value: Option<&Value>) -> Result<f64, ValidationError> {
  let t = match value {
    None => return Ok(DEFAULT_TEMPERATURE),
    Some(Value::Number(n)) => n
      .as_f64()
      .filter(|t| t.is_finite())
      .ok_or_else(|| ValidationError::new("temperature must be a finite number"))?,
    Some(_) => return Err(ValidationError::new("temperature must be a finite number")),
  };
  if !(0.0..=2.0).contains(&t) {
    return Err(ValidationError::new("temperature must be between 0 and 2"));
  }
  Ok(t)
}

pub fn validate_chat(body: &Map<String, Value>, default_model: &str) -> Result<ChatRequest, ValidationError> {
  let messages = validate_messages(body.get("messages"))?;
  let model = validate_model(body.get("model"), default_model)?;
  let temperature = validate_temperature(body.get("temperature"))?;
  Ok(ChatRequest { messages, model, temperature })
}

// ------------------------------------------------------------ feedback

#[derive(Clone, Debug, PartialEq)]
pub struct FeedbackResult {
  pub score_percent: f64,
  pub correct_count: f64,
  pub total: f64,
  pub wrong_count: f64,
  pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeedbackPayload {
  pub first_name: String,
  pub last_name: String,
  pub feedback: String,
  pub lang: Lang,
  pub result: FeedbackResult,
}

fn trimmed_string(body: &Map<String, Value>, key: &str) -> String {
  body.get(key).and_then(Value::as_str).map(|s| s.trim().to_string()).unwrap_or_default()
}

fn lang_field(body: &Map<String, Value>) -> Lang {
  Lang::from_loose(body.get("lang").and_then(Value::as_str))
}

pub fn validate_feedback(body: &Map<String, Value>) -> Result<FeedbackPayload, ValidationError> {
  let first_name = trimmed_string(body, "firstName");
  let last_name = trimmed_string(body, "lastName");
  let feedback = trimmed_string(body, "feedback");

  if first_name.is_empty() || char_len(&first_name) > MAX_PERSON_NAME {
    return Err(ValidationError::new(format!("firstName must be between 1 and {} characters", MAX_PERSON_NAME)));
  }
  if last_name.is_empty() || char_len(&last_name) > MAX_PERSON_NAME {
    return Err(ValidationError::new(format!("lastName must be between 1 and {} characters", MAX_PERSON_NAME)));
  }
  let len = char_len(&feedback);
  if !(MIN_FEEDBACK..=MAX_FEEDBACK).contains(&len) {
    return Err(ValidationError::new(format!(
      "feedback must be between {} and {} characters",
      MIN_FEEDBACK, MAX_FEEDBACK
    )));
  }

  let result = body
    .get("result")
    .and_then(Value::as_object)
    .ok_or_else(|| ValidationError::new("result summary is required"))?;

  let invalid = || ValidationError::new("result summary is invalid");
  let number = |key: &str| finite_number(result.get(key)).ok_or_else(invalid);
  let score_percent = number("scorePercent")?;
  let correct_count = number("correctCount")?;
  let total = number("total")?;
  let wrong_count = number("wrongCount")?;
  let created_at = result
    .get("createdAt")
    .and_then(Value::as_str)
    .and_then(parse_timestamp)
    .ok_or_else(invalid)?;

  Ok(FeedbackPayload {
    first_name,
    last_name,
    feedback,
    lang: lang_field(body),
    result: FeedbackResult { score_percent, correct_count, total, wrong_count, created_at },
  })
}

// --------------------------------------------------------- leaderboard

#[derive(Clone, Debug, PartialEq)]
pub struct LeaderboardSubmission {
  pub name: String,
  pub score_percent: f64,
  pub correct_count: u32,
  pub total: u32,
  pub elapsed_ms: u64,
  pub lang: Lang,
  pub submitted_at: DateTime<Utc>,
}

impl LeaderboardSubmission {
  pub fn into_entry(self, id: String) -> LeaderboardEntry {
    LeaderboardEntry {
      id,
      name_key: name_key(&self.name),
      name: self.name,
      score_percent: self.score_percent,
      correct_count: self.correct_count,
      total: self.total,
      elapsed_ms: self.elapsed_ms,
      lang: self.lang,
      submitted_at: self.submitted_at,
    }
  }
}

/// Numbers are coerced loosely, checked against their ranges, then rounded
/// (score to two decimals, the rest to integers). A missing or unparseable
/// `submittedAt` becomes `now`.
pub fn validate_leaderboard_submission(
  body: &Map<String, Value>,
  now: DateTime<Utc>,
) -> Result<LeaderboardSubmission, ValidationError> {
  let name = normalize_name(body.get("name").and_then(Value::as_str).unwrap_or(""));
  let name_len = char_len(&name);
  if !(MIN_PLAYER_NAME..=MAX_PLAYER_NAME).contains(&name_len) {
    return Err(ValidationError::new(format!(
      "name must be between {} and {} characters",
      MIN_PLAYER_NAME, MAX_PLAYER_NAME
    )));
  }

  let score_percent = finite_number(body.get("scorePercent"))
    .filter(|v| (0.0..=100.0).contains(v))
    .ok_or_else(|| ValidationError::new("scorePercent must be between 0 and 100"))?;
  let total = finite_number(body.get("total"))
    .filter(|v| (1.0..=MAX_TOTAL_QUESTIONS).contains(v))
    .ok_or_else(|| ValidationError::new("total must be between 1 and 200"))?;
  let correct_count = finite_number(body.get("correctCount"))
    .filter(|v| (0.0..=total).contains(v))
    .ok_or_else(|| ValidationError::new("correctCount must be between 0 and total"))?;
  let elapsed_ms = finite_number(body.get("elapsedMs"))
    .filter(|v| (MIN_ELAPSED_MS..=MAX_ELAPSED_MS).contains(v))
    .ok_or_else(|| ValidationError::new("elapsedMs must be between 1000 and 21600000"))?;

  let submitted_at = body
    .get("submittedAt")
    .and_then(Value::as_str)
    .and_then(parse_timestamp)
    .unwrap_or(now);

  Ok(LeaderboardSubmission {
    name,
    score_percent: (score_percent * 100.0).round() / 100.0,
    correct_count: correct_count.round() as u32,
    total: total.round() as u32,
    elapsed_ms: elapsed_ms.round() as u64,
    lang: lang_field(body),
    submitted_at,
  })
}

/// `?limit=` for the leaderboard read: default 5, rounded, clamped to [1, 20].
pub fn resolve_limit(raw: Option<&str>) -> usize {
  let raw = match raw.map(str::trim) {
    Some(s) if !s.is_empty() => s,
    _ => return DEFAULT_LIMIT,
  };
  match finite_number(Some(&Value::String(raw.to_string()))) {
    Some(n) => n.round().clamp(1.0, MAX_LIMIT) as usize,
    None => DEFAULT_LIMIT,
  }
}
