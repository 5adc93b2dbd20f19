//! Answer grading: per-type comparison, fuzzy short answers and quiz aggregation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, instrument};
use unicode_normalization::UnicodeNormalization;
use uuid::Builder;

use crate::domain::{AnswerValue, Question, QuestionType, QuizEvaluationItem, QuizResult, QuizSetup};
use crate::util::{clamp, to_iso};

/// Minimum edit similarity for a short answer that is not an exact match.
pub const SIMILARITY_THRESHOLD: f64 = 0.86;

const TRUE_TOKENS: [&str; 5] = ["true", "togri", "to g ri", "ha", "yes"];
const FALSE_TOKENS: [&str; 6] = ["false", "notogri", "no", "yoq", "yo q", "not true"];

/// Decompose, drop combining marks, case-fold, turn punctuation into spaces, collapse whitespace.
pub fn normalize_text(input: &str) -> String {
  let folded: String = input
    .nfkd()
    .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
    .collect::<String>()
    .to_lowercase()
    .chars()
    .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
    .collect();
  folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Classic edit distance over chars with a full matrix.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
  let a: Vec<char> = a.chars().collect();
  let b: Vec<char> = b.chars().collect();
  let rows = a.len() + 1;
  let cols = b.len() + 1;

  let mut matrix = vec![vec![0usize; cols]; rows];
  for (i, row) in matrix.iter_mut().enumerate() {
    row[0] = i;
  }
  for j in 0..cols {
    matrix[0][j] = j;
  }

  for i in 1..rows {
    for j in 1..cols {
      let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
      matrix[i][j] = (matrix[i - 1][j] + 1)
        .min(matrix[i][j - 1] + 1)
        .min(matrix[i - 1][j - 1] + cost);
    }
  }
  matrix[rows - 1][cols - 1]
}

/// `1 - distance / max_len`; two empty strings are identical.
pub fn similarity(a: &str, b: &str) -> f64 {
  if a == b {
    return 1.0;
  }
  let max_len = a.chars().count().max(b.chars().count());
  if max_len == 0 {
    return 1.0;
  }
  1.0 - levenshtein_distance(a, b) as f64 / max_len as f64
}

pub fn is_short_answer_correct(user: &str, answer: &str, accepted: &[String]) -> bool {
  let user = normalize_text(user);
  if user.is_empty() {
    return false;
  }

  let candidates: Vec<String> = std::iter::once(answer)
    .chain(accepted.iter().map(String::as_str))
    .map(normalize_text)
    .filter(|c| !c.is_empty())
    .collect();

  if candidates.iter().any(|c| *c == user) {
    return true;
  }

  let user_len = user.chars().count();
  candidates.iter().any(|c| {
    // Very short strings are too easy to hit by accident.
    if c.chars().count().min(user_len) <= 3 {
      return false;
    }
    similarity(&user, c) >= SIMILARITY_THRESHOLD
  })
}

/// Native booleans pass through; text must be one of the known en/uz tokens.
pub fn normalize_boolean_answer(value: &AnswerValue) -> Option<bool> {
  match value {
    AnswerValue::Bool(b) => Some(*b),
    AnswerValue::Text(s) => {
      let normalized = normalize_text(s);
      if TRUE_TOKENS.contains(&normalized.as_str()) {
        Some(true)
      } else if FALSE_TOKENS.contains(&normalized.as_str()) {
        Some(false)
      } else {
        None
      }
    }
  }
}

pub fn is_answer_correct(question: &Question, answer: &AnswerValue) -> bool {
  match (question.kind, &question.correct_answer) {
    (QuestionType::ShortAnswer, AnswerValue::Text(expected)) => {
      is_short_answer_correct(&answer.to_string(), expected, &question.accepted_answers)
    }
    (QuestionType::TrueFalse, AnswerValue::Bool(expected)) => normalize_boolean_answer(answer) == Some(*expected),
    (_, expected) => normalize_text(&answer.to_string()) == normalize_text(&expected.to_string()),
  }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
  pub article_title: String,
  pub section: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub article_slug: Option<String>,
}

/// One graded question with enough detail to explain a mistake later.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedItem {
  pub id: String,
  pub prompt: String,
  #[serde(rename = "type")]
  pub kind: QuestionType,
  pub correct_answer: AnswerValue,
  pub user_answer: AnswerValue,
  pub source: SourceRef,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub explanation_context: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeReport {
  pub total: usize,
  pub correct_count: usize,
  pub correct: Vec<GradedItem>,
  pub wrong: Vec<GradedItem>,
}

fn user_answer_for(question: &Question, answers: &HashMap<String, AnswerValue>) -> AnswerValue {
  answers.get(&question.id).cloned().unwrap_or_default()
}

/// Grade every question; missing answers count as an empty string.
#[instrument(level = "debug", target = "quiz", skip_all, fields(questions = questions.len(), answers = answers.len()))]
pub fn grade_quiz(questions: &[Question], answers: &HashMap<String, AnswerValue>) -> GradeReport {
  let mut correct = Vec::new();
  let mut wrong = Vec::new();

  for q in questions {
    let user_answer = user_answer_for(q, answers);
    let ok = is_answer_correct(q, &user_answer);
    let item = GradedItem {
      id: q.id.clone(),
      prompt: q.prompt.clone(),
      kind: q.kind,
      correct_answer: q.correct_answer.clone(),
      user_answer,
      source: SourceRef {
        article_title: q.source_article_title.clone(),
        section: q.source_section.clone(),
        article_slug: q.source_article_slug.clone(),
      },
      explanation_context: q.explanation_context.clone(),
    };
    if ok {
      correct.push(item);
    } else {
      wrong.push(item);
    }
  }

  debug!(target: "quiz", total = questions.len(), correct = correct.len(), "Quiz graded");
  GradeReport { total: questions.len(), correct_count: correct.len(), correct, wrong }
}

/// Rounded percentage in [0, 100]; zero questions score zero.
pub fn score_percent(correct: usize, total: usize) -> u32 {
  if total == 0 {
    return 0;
  }
  clamp(correct as f64 / total as f64 * 100.0, 0.0, 100.0).round() as u32
}

/// Grade an attempt into a `QuizResult` that echoes the setup.
pub fn evaluate_quiz<R: Rng + ?Sized>(
  setup: &QuizSetup,
  questions: &[Question],
  answers: &HashMap<String, AnswerValue>,
  now: DateTime<Utc>,
  rng: &mut R,
) -> QuizResult {
  let items: Vec<QuizEvaluationItem> = questions
    .iter()
    .map(|q| {
      let user_answer = user_answer_for(q, answers);
      let is_correct = is_answer_correct(q, &user_answer);
      QuizEvaluationItem { question: q.clone(), user_answer, is_correct }
    })
    .collect();

  let correct_count = items.iter().filter(|i| i.is_correct).count();
  QuizResult {
    id: format!("result-{}", Builder::from_random_bytes(rng.gen()).into_uuid()),
    created_at: to_iso(&now),
    setup: setup.clone(),
    score: score_percent(correct_count, items.len()),
    correct_count,
    incorrect_count: items.len() - correct_count,
    items,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Difficulty, Lang, QuizScope};
  use rand::{rngs::StdRng, SeedableRng};

  fn question(id: &str, kind: QuestionType, answer: AnswerValue, accepted: &[&str]) -> Question {
    Question {
      id: id.into(),
      kind,
      prompt: format!("prompt {}", id),
      options: None,
      correct_answer: answer,
      explanation: String::new(),
      source_article_title: "Title".into(),
      source_section: "Section".into(),
      accepted_answers: accepted.iter().map(|s| s.to_string()).collect(),
      source_article_slug: Some("slug".into()),
      explanation_context: None,
    }
  }

  #[test]
  fn normalization_strips_marks_and_punctuation() {
    assert_eq!(normalize_text("  To\u{2018}g\u{2018}ri!  "), "to g ri");
    assert_eq!(normalize_text("Éudaimonía, "), "eudaimonia");
    assert_eq!(normalize_text("Wu-wei"), "wu wei");
  }

  #[test]
  fn exact_short_answer_after_normalization() {
    assert!(is_short_answer_correct("ATARAXIA ", "Ataraxia", &["ataraxia".into()]));
    assert!(is_short_answer_correct("flourishing", "Eudaimonia", &["flourishing".into()]));
  }

  #[test]
  fn transposition_below_threshold_is_rejected() {
    assert!((similarity("eudaimonai", "eudaimonia") - 0.8).abs() < 1e-9);
    assert!(!is_short_answer_correct("eudaimonai", "eudaimonia", &[]));
  }

  #[test]
  fn near_miss_above_threshold_is_accepted() {
    // one substitution in 12 chars
    assert!(is_short_answer_correct("Epicureanisn", "Epicureanism", &[]));
    assert!(is_short_answer_correct("Four Noble Truth", "Four Noble Truths", &[]));
  }

  #[test]
  fn short_strings_need_exact_match() {
    assert!(!is_short_answer_correct("Re", "Ren", &[]));
    assert!(!is_short_answer_correct("", "Ren", &[]));
    assert!(is_short_answer_correct("ren", "Ren", &[]));
  }

  #[test]
  fn boolean_vocabulary() {
    for token in ["true", "Togri", "to‘g‘ri", "ha", "YES"] {
      assert_eq!(normalize_boolean_answer(&token.into()), Some(true), "{}", token);
    }
    for token in ["false", "Notogri", "yoq", "yo‘q", "no", "not true"] {
      assert_eq!(normalize_boolean_answer(&token.into()), Some(false), "{}", token);
    }
    for token in ["maybe", "", "1", "truth"] {
      assert_eq!(normalize_boolean_answer(&token.into()), None, "{}", token);
    }
    assert_eq!(normalize_boolean_answer(&AnswerValue::Bool(false)), Some(false));
  }

  #[test]
  fn true_false_grading() {
    let q = question("tf", QuestionType::TrueFalse, AnswerValue::Bool(true), &[]);
    assert!(is_answer_correct(&q, &"ha".into()));
    assert!(is_answer_correct(&q, &AnswerValue::Bool(true)));
    assert!(!is_answer_correct(&q, &"no".into()));
    assert!(!is_answer_correct(&q, &"perhaps".into()));
  }

  #[test]
  fn multiple_choice_is_case_insensitive() {
    let q = question("mc", QuestionType::MultipleChoice, "Stoicism".into(), &[]);
    assert!(is_answer_correct(&q, &"stoicism".into()));
    assert!(!is_answer_correct(&q, &"Stoicis".into()));
  }

  #[test]
  fn grade_partitions_in_order() {
    let questions = vec![
      question("a", QuestionType::MultipleChoice, "Ren".into(), &[]),
      question("b", QuestionType::TrueFalse, AnswerValue::Bool(false), &[]),
      question("c", QuestionType::ShortAnswer, "Ataraxia".into(), &["ataraxia"]),
      question("d", QuestionType::ShortAnswer, "Logos".into(), &[]),
    ];
    let answers: HashMap<String, AnswerValue> = [
      ("a".to_string(), AnswerValue::from("ren")),
      ("b".to_string(), AnswerValue::from(true)),
      ("c".to_string(), AnswerValue::from("ATARAXIA ")),
    ]
    .into_iter()
    .collect();

    let report = grade_quiz(&questions, &answers);
    assert_eq!(report.total, 4);
    assert_eq!(report.correct_count, 2);
    assert_eq!(report.correct.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(), vec!["a", "c"]);
    assert_eq!(report.wrong.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(), vec!["b", "d"]);
    assert_eq!(report.wrong[1].user_answer, AnswerValue::Text(String::new()));
    assert_eq!(report.wrong[0].source.article_slug.as_deref(), Some("slug"));
  }

  #[test]
  fn score_rounding() {
    assert_eq!(score_percent(0, 0), 0);
    assert_eq!(score_percent(2, 3), 67);
    assert_eq!(score_percent(1, 3), 33);
    assert_eq!(score_percent(10, 10), 100);
  }

  #[test]
  fn evaluate_builds_result() {
    let setup = QuizSetup {
      language: Lang::En,
      scope: QuizScope::Mixed,
      difficulty: Difficulty::Easy,
      question_count: 5,
      article_slug: None,
    };
    let questions = vec![
      question("a", QuestionType::MultipleChoice, "Ren".into(), &[]),
      question("b", QuestionType::TrueFalse, AnswerValue::Bool(true), &[]),
    ];
    let answers: HashMap<String, AnswerValue> = [("a".to_string(), AnswerValue::from("Ren"))].into_iter().collect();
    let now = crate::util::parse_timestamp("2024-01-02T03:04:05Z").unwrap();
    let result = evaluate_quiz(&setup, &questions, &answers, now, &mut StdRng::seed_from_u64(1));
    assert!(result.id.starts_with("result-"));
    assert_eq!(result.created_at, "2024-01-02T03:04:05.000Z");
    assert_eq!(result.score, 50);
    assert_eq!((result.correct_count, result.incorrect_count), (1, 1));
    assert!(result.items[0].is_correct);
    assert!(!result.items[1].is_correct);
  }
}
