//! Endpoint pipelines shared by the HTTP handlers.
//!
//! Order inside every throttled pipeline:
//!   rate limit -> parse/validate -> configuration check -> upstream call.
//! The limiter records the access even when a later step fails.

use chrono::Utc;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::domain::{Article, Concept, Lang, Philosopher, QuizResult, QuizScope, Region, QUESTION_COUNTS};
use crate::content::TimelineEvent;
use crate::error::{ApiError, ValidationError};
use crate::generator::generate_quiz_questions;
use crate::grader::{evaluate_quiz, grade_quiz, GradeReport};
use crate::openai::completion_text;
use crate::protocol::*;
use crate::ratelimit::RateLimiter;
use crate::state::{now_ms, AppState};
use crate::telegram::build_feedback_text;
use crate::tutor::{build_messages, dont_know_phrase, explain_task, MistakeReport};
use crate::validation::{
  parse_json_object, resolve_limit, validate_chat, validate_feedback, validate_leaderboard_submission, ChatRequest,
  DEFAULT_LIMIT, MAX_CHAT_BODY_CHARS, MAX_FEEDBACK_BODY_CHARS, MAX_LEADERBOARD_BODY_CHARS, MAX_QUIZ_BODY_CHARS,
};

const MISSING_GROQ: &str = "Server is missing GROQ_API_KEY";
const MISSING_TELEGRAM: &str = "Server is missing TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID";
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

async fn throttle(limiter: &Mutex<RateLimiter>, key: &str) -> Result<(), ApiError> {
  if limiter.lock().await.check(key, now_ms()) {
    Ok(())
  } else {
    Err(ApiError::RateLimited)
  }
}

fn parse_as<T: DeserializeOwned>(raw: &[u8], max_chars: usize) -> Result<T, ValidationError> {
  let obj = parse_json_object(raw, max_chars)?;
  serde_json::from_value(Value::Object(obj)).map_err(|e| ValidationError::new(format!("invalid request body: {}", e)))
}

fn parse_region(raw: Option<&str>) -> Result<Option<Region>, ApiError> {
  match raw.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
    None | Some("") => Ok(None),
    Some("east") => Ok(Some(Region::East)),
    Some("west") => Ok(Some(Region::West)),
    Some(_) => Err(ApiError::Validation("region must be east or west".into())),
  }
}

/// `lb-<epoch ms>-<6 base36 chars>`.
fn leaderboard_id<R: Rng + ?Sized>(now_ms: u64, rng: &mut R) -> String {
  let suffix: String = (0..6).map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char).collect();
  format!("lb-{}-{}", now_ms, suffix)
}

pub async fn health(state: &AppState) -> HealthOut {
  HealthOut {
    ok: true,
    articles: state.content.articles().len(),
    philosophers: state.content.philosophers().len(),
    total_players: state.leaderboard.lock().await.count(),
  }
}

// ---------------------------------------------------------------- quiz

#[instrument(level = "info", skip(state, raw), fields(body_len = raw.len()))]
pub fn generate_quiz(state: &AppState, raw: &[u8]) -> Result<QuizOut, ApiError> {
  let setup: crate::domain::QuizSetup = parse_as(raw, MAX_QUIZ_BODY_CHARS)?;
  if !QUESTION_COUNTS.contains(&setup.question_count) {
    return Err(ApiError::Validation("questionCount must be one of 5, 10, 20".into()));
  }
  // The generator falls back to the whole dataset; surface that in the logs.
  if setup.scope == QuizScope::Article {
    let known = setup.article_slug.as_deref().map_or(false, |slug| state.content.article(slug).is_some());
    if !known {
      warn!(target: "quiz", slug = ?setup.article_slug, "Article scope not found; drawing from all content");
    }
  }

  let questions = generate_quiz_questions(&state.content, &setup, &mut rand::thread_rng());
  info!(target: "quiz", requested = setup.question_count, produced = questions.len(), lang = setup.language.as_str(), "Quiz generated");
  Ok(QuizOut { questions })
}

#[instrument(level = "info", skip(raw), fields(body_len = raw.len()))]
pub fn grade(raw: &[u8]) -> Result<GradeReport, ApiError> {
  let body: GradeIn = parse_as(raw, MAX_QUIZ_BODY_CHARS)?;
  let report = grade_quiz(&body.questions, &body.answers);
  info!(target: "quiz", total = report.total, correct = report.correct_count, "Quiz graded");
  Ok(report)
}

#[instrument(level = "info", skip(raw), fields(body_len = raw.len()))]
pub fn evaluate(raw: &[u8]) -> Result<QuizResult, ApiError> {
  let body: EvaluateIn = parse_as(raw, MAX_QUIZ_BODY_CHARS)?;
  let result = evaluate_quiz(&body.setup, &body.questions, &body.answers, Utc::now(), &mut rand::thread_rng());
  info!(target: "quiz", id = %result.id, score = result.score, "Quiz evaluated");
  Ok(result)
}

pub fn bank(state: &AppState, lang: Option<&str>) -> BankOut {
  let lang = Lang::from_loose(lang);
  BankOut { lang, questions: state.content.bank(lang).to_vec() }
}

#[instrument(level = "info", skip(state, raw), fields(body_len = raw.len()))]
pub fn bank_grade(state: &AppState, raw: &[u8]) -> Result<GradeReport, ApiError> {
  let body: BankGradeIn = parse_as(raw, MAX_QUIZ_BODY_CHARS)?;
  let lang = Lang::from_loose(body.lang.as_deref());
  let report = grade_quiz(state.content.bank(lang), &body.answers);
  info!(target: "quiz", lang = lang.as_str(), total = report.total, correct = report.correct_count, "Bank quiz graded");
  Ok(report)
}

// --------------------------------------------------------- leaderboard

#[instrument(level = "info", skip(state), fields(%ip))]
pub async fn leaderboard_get(state: &AppState, ip: &str, limit: Option<&str>) -> Result<LeaderboardOut, ApiError> {
  throttle(&state.leaderboard_limiter, &format!("{}:GET", ip)).await?;
  let limit = resolve_limit(limit);
  let board = state.leaderboard.lock().await;
  Ok(LeaderboardOut { entries: board.top(limit), total_players: board.count(), limit })
}

#[instrument(level = "info", skip(state, raw), fields(%ip, body_len = raw.len()))]
pub async fn leaderboard_post(state: &AppState, ip: &str, raw: &[u8]) -> Result<LeaderboardPostOut, ApiError> {
  throttle(&state.leaderboard_limiter, &format!("{}:POST", ip)).await?;
  let body = parse_json_object(raw, MAX_LEADERBOARD_BODY_CHARS)?;
  let submission = validate_leaderboard_submission(&body, Utc::now())?;
  let entry = submission.into_entry(leaderboard_id(now_ms(), &mut rand::thread_rng()));

  let mut board = state.leaderboard.lock().await;
  let updated = board.submit(entry);
  debug!(target: "leaderboard", updated, total = board.count(), "Submission processed");
  Ok(LeaderboardPostOut { ok: true, updated, entries: board.top(DEFAULT_LIMIT), total_players: board.count() })
}

// -------------------------------------------------------- chat / tutor

async fn complete(state: &AppState, req: &ChatRequest) -> Result<Value, ApiError> {
  let oa = state.openai.as_ref().ok_or_else(|| ApiError::MissingConfig(MISSING_GROQ.into()))?;
  oa.chat_completion(&req.model, req.temperature, &req.messages).await
}

#[instrument(level = "info", skip(state, raw), fields(%ip, body_len = raw.len()))]
pub async fn chat(state: &AppState, ip: &str, raw: &[u8]) -> Result<Value, ApiError> {
  throttle(&state.chat_limiter, ip).await?;
  let body = parse_json_object(raw, MAX_CHAT_BODY_CHARS)?;
  let req = validate_chat(&body, &state.config.groq_default_model)?;
  complete(state, &req).await
}

/// Run tutor messages through the chat validation, keeping the caller's model/temperature.
fn tutor_request(state: &AppState, body: &Map<String, Value>, messages: Vec<crate::openai::ChatMessage>) -> Result<ChatRequest, ApiError> {
  let mut chat = Map::new();
  let messages = serde_json::to_value(messages).map_err(|e| ApiError::Internal(e.to_string()))?;
  chat.insert("messages".into(), messages);
  for key in ["model", "temperature"] {
    if let Some(v) = body.get(key) {
      chat.insert(key.into(), v.clone());
    }
  }
  Ok(validate_chat(&chat, &state.config.groq_default_model)?)
}

async fn tutor_answer(state: &AppState, lang: Lang, req: &ChatRequest) -> Result<TutorOut, ApiError> {
  let data = complete(state, req).await?;
  let answer = completion_text(&data).unwrap_or_else(|| dont_know_phrase(lang).to_string());
  Ok(TutorOut { answer })
}

#[instrument(level = "info", skip(state, raw), fields(%ip, body_len = raw.len()))]
pub async fn tutor_ask(state: &AppState, ip: &str, raw: &[u8]) -> Result<TutorOut, ApiError> {
  throttle(&state.chat_limiter, ip).await?;
  let body = parse_json_object(raw, MAX_CHAT_BODY_CHARS)?;
  let input: TutorAskIn = serde_json::from_value(Value::Object(body.clone()))
    .map_err(|e| ValidationError::new(format!("invalid request body: {}", e)))?;
  if input.question.trim().is_empty() {
    return Err(ApiError::Validation("question must not be empty".into()));
  }

  let lang = Lang::from_loose(input.lang.as_deref());
  let messages = build_messages(&state.config.prompts, lang, input.question.trim(), &input.context);
  let req = tutor_request(state, &body, messages)?;
  tutor_answer(state, lang, &req).await
}

#[instrument(level = "info", skip(state, raw), fields(%ip, body_len = raw.len()))]
pub async fn tutor_explain(state: &AppState, ip: &str, raw: &[u8]) -> Result<TutorOut, ApiError> {
  throttle(&state.chat_limiter, ip).await?;
  let body = parse_json_object(raw, MAX_CHAT_BODY_CHARS)?;
  let input: TutorExplainIn = serde_json::from_value(Value::Object(body.clone()))
    .map_err(|e| ValidationError::new(format!("invalid request body: {}", e)))?;
  if input.prompt.trim().is_empty() {
    return Err(ApiError::Validation("prompt must not be empty".into()));
  }

  let lang = Lang::from_loose(input.lang.as_deref());
  let report = MistakeReport {
    prompt: &input.prompt,
    correct_answer: &input.correct_answer,
    user_answer: &input.user_answer,
    context: &input.context,
    article_slug: input.source.article_slug.as_deref(),
    section: input.source.section.as_deref(),
  };
  let (task, context) = explain_task(lang, &report);
  let messages = build_messages(&state.config.prompts, lang, &task, &context);
  let req = tutor_request(state, &body, messages)?;
  tutor_answer(state, lang, &req).await
}

// ------------------------------------------------------------ feedback

#[instrument(level = "info", skip(state, raw), fields(%ip, body_len = raw.len()))]
pub async fn feedback(state: &AppState, ip: &str, raw: &[u8]) -> Result<OkOut, ApiError> {
  throttle(&state.feedback_limiter, ip).await?;
  let body = parse_json_object(raw, MAX_FEEDBACK_BODY_CHARS)?;
  let payload = validate_feedback(&body)?;
  let tg = state.telegram.as_ref().ok_or_else(|| ApiError::MissingConfig(MISSING_TELEGRAM.into()))?;
  tg.send_message(&build_feedback_text(&payload)).await?;
  Ok(OkOut { ok: true })
}

// ------------------------------------------------------------- content

pub fn articles(state: &AppState, region: Option<&str>) -> Result<Vec<Article>, ApiError> {
  let region = parse_region(region)?;
  Ok(state.content.articles_in(region).into_iter().cloned().collect())
}

pub fn article(state: &AppState, slug: &str) -> Result<Article, ApiError> {
  state.content.article(slug).cloned().ok_or_else(|| ApiError::NotFound(format!("Unknown article: {}", slug)))
}

pub fn philosophers(state: &AppState, region: Option<&str>) -> Result<Vec<Philosopher>, ApiError> {
  let region = parse_region(region)?;
  Ok(state.content.philosophers_in(region).into_iter().cloned().collect())
}

pub fn philosopher(state: &AppState, slug: &str) -> Result<Philosopher, ApiError> {
  state.content.philosopher(slug).cloned().ok_or_else(|| ApiError::NotFound(format!("Unknown philosopher: {}", slug)))
}

pub fn concepts(state: &AppState) -> Vec<Concept> {
  state.content.concepts().to_vec()
}

pub fn timeline(state: &AppState, lang: Option<&str>) -> Vec<TimelineEvent> {
  state.content.timeline(Lang::from_loose(lang))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AppConfig;
  use rand::{rngs::StdRng, SeedableRng};

  fn state() -> AppState {
    AppState::new(AppConfig::default())
  }

  #[test]
  fn ids_are_base36_suffixed() {
    let mut rng = StdRng::seed_from_u64(7);
    let id = leaderboard_id(1_714_557_600_000, &mut rng);
    let suffix = id.strip_prefix("lb-1714557600000-").unwrap();
    assert_eq!(suffix.len(), 6);
    assert!(suffix.bytes().all(|b| ID_ALPHABET.contains(&b)));
  }

  #[test]
  fn region_parsing() {
    assert_eq!(parse_region(None).unwrap(), None);
    assert_eq!(parse_region(Some(" West ")).unwrap(), Some(Region::West));
    assert!(matches!(parse_region(Some("north")), Err(ApiError::Validation(_))));
  }

  #[test]
  fn generate_rejects_odd_counts() {
    let s = state();
    let err = generate_quiz(&s, br#"{"scope":"mixed","difficulty":"easy","questionCount":7}"#).unwrap_err();
    assert!(matches!(err, ApiError::Validation(m) if m.contains("questionCount")));
    let ok = generate_quiz(&s, br#"{"language":"uz","scope":"east","difficulty":"medium","questionCount":5}"#).unwrap();
    assert_eq!(ok.questions.len(), 5);
  }

  #[test]
  fn unknown_article_scope_falls_back_to_everything() {
    let out = generate_quiz(
      &state(),
      br#"{"scope":"article","difficulty":"easy","questionCount":5,"articleSlug":"no-such"}"#,
    )
    .unwrap();
    assert_eq!(out.questions.len(), 5);
  }

  #[test]
  fn bank_grade_uses_server_copy() {
    let s = state();
    let report = bank_grade(&s, br#"{"lang":"en","answers":{"en-4":"flourishing","en-2":false}}"#).unwrap();
    assert_eq!(report.total, s.content.bank(Lang::En).len());
    assert!(report.correct_count >= 2);
  }

  #[tokio::test]
  async fn chat_without_key_is_missing_config() {
    let s = state();
    let err = chat(&s, "10.0.0.1", br#"{"messages":[{"role":"user","content":"hi"}]}"#).await.unwrap_err();
    assert!(matches!(err, ApiError::MissingConfig(m) if m == MISSING_GROQ));
    // same client inside the window
    let again = chat(&s, "10.0.0.1", br#"{"messages":[{"role":"user","content":"hi"}]}"#).await.unwrap_err();
    assert!(matches!(again, ApiError::RateLimited));
  }

  #[tokio::test]
  async fn tutor_validates_before_config_check() {
    let s = state();
    let err = tutor_ask(&s, "10.0.0.2", br#"{"question":"  "}"#).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    let err = tutor_ask(&s, "10.0.0.3", br#"{"question":"What is ren?","temperature":5}"#).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    let err = tutor_explain(&s, "10.0.0.4", br#"{"prompt":"Q","correctAnswer":true}"#).await.unwrap_err();
    assert!(matches!(err, ApiError::MissingConfig(_)));
  }

  #[tokio::test]
  async fn leaderboard_methods_are_throttled_separately() {
    let s = state();
    let body = br#"{"name":"Ana","scorePercent":80,"correctCount":4,"total":5,"elapsedMs":42000}"#;
    let posted = leaderboard_post(&s, "10.0.0.5", body).await.unwrap();
    assert!(posted.ok && posted.updated);
    let read = leaderboard_get(&s, "10.0.0.5", Some("3")).await.unwrap();
    assert_eq!((read.total_players, read.limit), (1, 3));
    assert_eq!(read.entries[0].name, "Ana");
    assert!(matches!(leaderboard_post(&s, "10.0.0.5", body).await, Err(ApiError::RateLimited)));
  }

  #[tokio::test]
  async fn feedback_without_relay_is_missing_config() {
    let body = br#"{"firstName":"Ana","lastName":"K","feedback":"Great","result":{"scorePercent":80,"correctCount":4,"total":5,"wrongCount":1,"createdAt":"2024-05-01T10:00:00Z"}}"#;
    let err = feedback(&state(), "10.0.0.6", body).await.unwrap_err();
    assert!(matches!(err, ApiError::MissingConfig(m) if m == MISSING_TELEGRAM));
  }

  #[tokio::test]
  async fn undecodable_body_is_counted_before_rejection() {
    let s = state();
    let err = chat(&s, "10.0.0.7", b"{\"messages\":\"\xc3\x28\"}").await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(m) if m == "invalid JSON body"));
    let again = chat(&s, "10.0.0.7", b"{}").await.unwrap_err();
    assert!(matches!(again, ApiError::RateLimited));
  }

  #[test]
  fn content_lookups() {
    let s = state();
    assert!(article(&s, "plato-forms-justice").is_ok());
    assert!(matches!(philosopher(&s, "nobody"), Err(ApiError::NotFound(_))));
    let east = articles(&s, Some("east")).unwrap();
    assert!(east.iter().all(|a| a.region == Region::East));
    assert!(!timeline(&s, Some("uz")).is_empty());
  }
}
