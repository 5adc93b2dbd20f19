//! Error taxonomy for the HTTP boundary.
//!
//! Everything a handler can fail with ends up here and is rendered as a JSON
//! `{ "error": ... }` body. Internal details are logged, never returned.

use axum::{
  http::{header, HeaderValue, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;

/// A payload constraint that was violated. The message names the constraint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
  pub fn new(msg: impl Into<String>) -> Self {
    Self(msg.into())
  }
}

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  NotFound(String),

  #[error("Method Not Allowed")]
  MethodNotAllowed { allow: &'static str },

  #[error("Too many requests. Slow down.")]
  RateLimited,

  #[error("{0}")]
  MissingConfig(String),

  #[error("Request timeout while calling {0}")]
  Timeout(String),

  #[error("{message}")]
  Upstream { message: String, status: u16 },

  #[error("delivery failed: {0}")]
  Delivery(String),

  #[error("internal error: {0}")]
  Internal(String),
}

impl From<ValidationError> for ApiError {
  fn from(e: ValidationError) -> Self {
    ApiError::Validation(e.0)
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response(),
      ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))).into_response(),
      ApiError::MethodNotAllowed { allow } => {
        let mut res = (
          StatusCode::METHOD_NOT_ALLOWED,
          Json(json!({ "error": "Method Not Allowed" })),
        )
          .into_response();
        res.headers_mut().insert(header::ALLOW, HeaderValue::from_static(allow));
        res
      }
      ApiError::RateLimited => (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({ "error": "Too many requests. Slow down." })),
      )
        .into_response(),
      ApiError::MissingConfig(msg) => {
        tracing::error!(target: "dualium_backend", %msg, "Missing server configuration");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": msg }))).into_response()
      }
      ApiError::Timeout(upstream) => {
        tracing::warn!(target: "dualium_backend", %upstream, "Upstream call timed out");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "error": format!("Request timeout while calling {}", upstream) })),
        )
          .into_response()
      }
      ApiError::Upstream { message, status } => (
        StatusCode::BAD_GATEWAY,
        Json(json!({ "error": message, "upstreamStatus": status })),
      )
        .into_response(),
      ApiError::Delivery(detail) => {
        tracing::error!(target: "dualium_backend", %detail, "Feedback delivery failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "error": "Failed to deliver feedback to Telegram" })),
        )
          .into_response()
      }
      ApiError::Internal(detail) => {
        tracing::error!(target: "dualium_backend", %detail, "Internal Server Error");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "error": "Internal Server Error" })),
        )
          .into_response()
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn method_not_allowed_carries_allow_header() {
    let res = ApiError::MethodNotAllowed { allow: "GET, POST" }.into_response();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers().get(header::ALLOW).unwrap(), "GET, POST");
  }

  #[test]
  fn status_mapping() {
    assert_eq!(ApiError::Validation("x".into()).into_response().status(), StatusCode::BAD_REQUEST);
    assert_eq!(ApiError::RateLimited.into_response().status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
      ApiError::Upstream { message: "bad".into(), status: 401 }.into_response().status(),
      StatusCode::BAD_GATEWAY
    );
    assert_eq!(ApiError::Timeout("Groq".into()).into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(ApiError::Internal("boom".into()).into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
