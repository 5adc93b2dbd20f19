//! Public HTTP request/response structs (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{AnswerValue, Lang, Question, QuizSetup};
use crate::leaderboard::PublicEntry;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthOut {
    pub ok: bool,
    pub articles: usize,
    pub philosophers: usize,
    pub total_players: usize,
}

// --- quiz ---

#[derive(Debug, Serialize)]
pub struct QuizOut {
    pub questions: Vec<Question>,
}

/// Questions as previously generated plus the user's answers keyed by question id.
#[derive(Debug, Deserialize)]
pub struct GradeIn {
    pub questions: Vec<Question>,
    #[serde(default)]
    pub answers: HashMap<String, AnswerValue>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateIn {
    pub setup: QuizSetup,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub answers: HashMap<String, AnswerValue>,
}

#[derive(Debug, Serialize)]
pub struct BankOut {
    pub lang: Lang,
    pub questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
pub struct BankGradeIn {
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub answers: HashMap<String, AnswerValue>,
}

// --- leaderboard ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardOut {
    pub entries: Vec<PublicEntry>,
    pub total_players: usize,
    pub limit: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPostOut {
    pub ok: bool,
    pub updated: bool,
    pub entries: Vec<PublicEntry>,
    pub total_players: usize,
}

// --- feedback / tutor ---

#[derive(Debug, Serialize)]
pub struct OkOut {
    pub ok: bool,
}

#[derive(Debug, Deserialize)]
pub struct TutorAskIn {
    #[serde(default)]
    pub lang: Option<String>,
    pub question: String,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceIn {
    #[serde(default)]
    pub article_slug: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorExplainIn {
    #[serde(default)]
    pub lang: Option<String>,
    pub prompt: String,
    pub correct_answer: AnswerValue,
    #[serde(default)]
    pub user_answer: AnswerValue,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub source: SourceIn,
}

#[derive(Debug, Serialize)]
pub struct TutorOut {
    pub answer: String,
}
