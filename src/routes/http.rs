//! HTTP endpoint handlers. These are thin wrappers that forward to `logic`.
//! Bodies arrive as raw bytes so the limiter runs before any decoding, and no extractor
//! here rejects a request on its own: malformed input reaches `logic` and fails as `ApiError`.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use axum::{
  async_trait,
  body::Bytes,
  extract::{rejection::PathRejection, ConnectInfo, FromRequestParts, Path, Query, State},
  http::request::Parts,
  Json,
};
use serde_json::Value;
use tracing::instrument;

use crate::content::TimelineEvent;
use crate::domain::{Article, Concept, Philosopher, QuizResult};
use crate::error::ApiError;
use crate::grader::GradeReport;
use crate::logic;
use crate::protocol::*;
use crate::state::AppState;

type Shared = State<Arc<AppState>>;

/// Client address: first `x-forwarded-for` entry, else the socket peer, else `"unknown"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    let forwarded = parts
      .headers
      .get("x-forwarded-for")
      .and_then(|v| v.to_str().ok())
      .filter(|v| !v.is_empty())
      .map(|v| v.split(',').next().unwrap_or("").trim().to_string());
    if let Some(ip) = forwarded {
      return Ok(ClientIp(ip));
    }
    let peer = parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|ConnectInfo(addr)| addr.ip().to_string());
    Ok(ClientIp(peer.unwrap_or_else(|| "unknown".into())))
  }
}

/// Decoded query pairs in request order. Repeated keys are kept; lookups take the first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(pub Vec<(String, String)>);

impl QueryParams {
  pub fn first(&self, key: &str) -> Option<&str> {
    self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
  }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for QueryParams {
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    let pairs = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri).map(|Query(pairs)| pairs).unwrap_or_default();
    Ok(QueryParams(pairs))
  }
}

/// A slug that fails to decode cannot name any entry, so it falls through to the 404 lookup.
fn slug(path: Result<Path<String>, PathRejection>) -> String {
  path.map(|Path(slug)| slug).unwrap_or_default()
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): Shared) -> Json<HealthOut> {
  Json(logic::health(&state).await)
}

// --- quiz ---

#[instrument(level = "info", skip(state, body))]
pub async fn http_quiz_generate(State(state): Shared, body: Bytes) -> Result<Json<QuizOut>, ApiError> {
  logic::generate_quiz(&state, &body).map(Json)
}

#[instrument(level = "info", skip(body))]
pub async fn http_quiz_grade(body: Bytes) -> Result<Json<GradeReport>, ApiError> {
  logic::grade(&body).map(Json)
}

#[instrument(level = "info", skip(body))]
pub async fn http_quiz_evaluate(body: Bytes) -> Result<Json<QuizResult>, ApiError> {
  logic::evaluate(&body).map(Json)
}

#[instrument(level = "info", skip(state))]
pub async fn http_quiz_bank(State(state): Shared, q: QueryParams) -> Json<BankOut> {
  Json(logic::bank(&state, q.first("lang")))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_quiz_bank_grade(State(state): Shared, body: Bytes) -> Result<Json<GradeReport>, ApiError> {
  logic::bank_grade(&state, &body).map(Json)
}

// --- throttled ---

#[instrument(level = "info", skip(state), fields(ip = %ip.0))]
pub async fn http_leaderboard_get(
  State(state): Shared,
  ip: ClientIp,
  q: QueryParams,
) -> Result<Json<LeaderboardOut>, ApiError> {
  logic::leaderboard_get(&state, &ip.0, q.first("limit")).await.map(Json)
}

#[instrument(level = "info", skip(state, body), fields(ip = %ip.0))]
pub async fn http_leaderboard_post(
  State(state): Shared,
  ip: ClientIp,
  body: Bytes,
) -> Result<Json<LeaderboardPostOut>, ApiError> {
  logic::leaderboard_post(&state, &ip.0, &body).await.map(Json)
}

#[instrument(level = "info", skip(state, body), fields(ip = %ip.0))]
pub async fn http_chat(State(state): Shared, ip: ClientIp, body: Bytes) -> Result<Json<Value>, ApiError> {
  logic::chat(&state, &ip.0, &body).await.map(Json)
}

#[instrument(level = "info", skip(state, body), fields(ip = %ip.0))]
pub async fn http_feedback(State(state): Shared, ip: ClientIp, body: Bytes) -> Result<Json<OkOut>, ApiError> {
  logic::feedback(&state, &ip.0, &body).await.map(Json)
}

#[instrument(level = "info", skip(state, body), fields(ip = %ip.0))]
pub async fn http_tutor_ask(State(state): Shared, ip: ClientIp, body: Bytes) -> Result<Json<TutorOut>, ApiError> {
  logic::tutor_ask(&state, &ip.0, &body).await.map(Json)
}

#[instrument(level = "info", skip(state, body), fields(ip = %ip.0))]
pub async fn http_tutor_explain(State(state): Shared, ip: ClientIp, body: Bytes) -> Result<Json<TutorOut>, ApiError> {
  logic::tutor_explain(&state, &ip.0, &body).await.map(Json)
}

// --- content ---

#[instrument(level = "info", skip(state))]
pub async fn http_articles(State(state): Shared, q: QueryParams) -> Result<Json<Vec<Article>>, ApiError> {
  logic::articles(&state, q.first("region")).map(Json)
}

#[instrument(level = "info", skip(state))]
pub async fn http_article(State(state): Shared, path: Result<Path<String>, PathRejection>) -> Result<Json<Article>, ApiError> {
  logic::article(&state, &slug(path)).map(Json)
}

#[instrument(level = "info", skip(state))]
pub async fn http_philosophers(
  State(state): Shared,
  q: QueryParams,
) -> Result<Json<Vec<Philosopher>>, ApiError> {
  logic::philosophers(&state, q.first("region")).map(Json)
}

#[instrument(level = "info", skip(state))]
pub async fn http_philosopher(State(state): Shared, path: Result<Path<String>, PathRejection>) -> Result<Json<Philosopher>, ApiError> {
  logic::philosopher(&state, &slug(path)).map(Json)
}

pub async fn http_concepts(State(state): Shared) -> Json<Vec<Concept>> {
  Json(logic::concepts(&state))
}

pub async fn http_timeline(State(state): Shared, q: QueryParams) -> Json<Vec<TimelineEvent>> {
  Json(logic::timeline(&state, q.first("lang")))
}
