//! Dualium quiz backend: bilingual (en/uz) philosophy quizzes, grading,
//! a leaderboard, and relays to a chat-completion API and a Telegram channel.

pub mod config;
pub mod content;
pub mod domain;
pub mod error;
pub mod generator;
pub mod grader;
pub mod leaderboard;
pub mod logic;
pub mod openai;
pub mod protocol;
pub mod ratelimit;
pub mod routes;
pub mod seeds;
pub mod state;
pub mod telegram;
pub mod telemetry;
pub mod tutor;
pub mod util;
pub mod validation;

pub use routes::build_router;
pub use state::AppState;
