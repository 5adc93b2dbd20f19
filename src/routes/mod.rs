//! Router assembly: JSON API under `/api`, CORS, security headers and HTTP tracing.

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    routing::{get, post, MethodRouter},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::error::ApiError;
use crate::state::AppState;

pub mod http;

/// Any method the route does not list gets a JSON 405 with `Allow`.
fn only<S>(route: MethodRouter<S>, allow: &'static str) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.fallback(move || async move { ApiError::MethodNotAllowed { allow } })
}

/// Build the application router with:
/// - quiz, leaderboard, chat, feedback and tutor endpoints
/// - read-only content endpoints
/// - `Cache-Control: no-store` and `X-Content-Type-Options: nosniff` on every response
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", only(get(http::http_health), "GET"))
        // Quiz
        .route("/api/quiz/generate", only(post(http::http_quiz_generate), "POST"))
        .route("/api/quiz/grade", only(post(http::http_quiz_grade), "POST"))
        .route("/api/quiz/evaluate", only(post(http::http_quiz_evaluate), "POST"))
        .route("/api/quiz/bank", only(get(http::http_quiz_bank), "GET"))
        .route("/api/quiz/bank/grade", only(post(http::http_quiz_bank_grade), "POST"))
        // Throttled
        .route(
            "/api/leaderboard",
            only(
                get(http::http_leaderboard_get).post(http::http_leaderboard_post),
                "GET, POST",
            ),
        )
        .route("/api/chat", only(post(http::http_chat), "POST"))
        .route("/api/feedback", only(post(http::http_feedback), "POST"))
        .route("/api/tutor/ask", only(post(http::http_tutor_ask), "POST"))
        .route("/api/tutor/explain", only(post(http::http_tutor_explain), "POST"))
        // Content
        .route("/api/articles", only(get(http::http_articles), "GET"))
        .route("/api/articles/:slug", only(get(http::http_article), "GET"))
        .route("/api/philosophers", only(get(http::http_philosophers), "GET"))
        .route("/api/philosophers/:slug", only(get(http::http_philosopher), "GET"))
        .route("/api/concepts", only(get(http::http_concepts), "GET"))
        .route("/api/timeline", only(get(http::http_timeline), "GET"))
        .fallback(|| async { ApiError::NotFound("Not Found".into()) })
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                )),
        )
}
