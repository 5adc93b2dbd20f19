//! Domain models: content (articles, philosophers, concepts) and quiz types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Interface language. Anything that is not literally "uz" is English.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
  #[default]
  En,
  Uz,
}

impl Lang {
  /// "uz" selects Uzbek; every other value (or none) falls back to English.
  pub fn from_loose(raw: Option<&str>) -> Self {
    match raw {
      Some("uz") => Lang::Uz,
      _ => Lang::En,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Lang::En => "en",
      Lang::Uz => "uz",
    }
  }

  /// Pick the English or Uzbek variant.
  pub fn pick<'a>(&self, en: &'a str, uz: &'a str) -> &'a str {
    match self {
      Lang::En => en,
      Lang::Uz => uz,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
  East,
  West,
}

/// Region tag on concepts, which may belong to both traditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConceptRegion {
  East,
  West,
  Both,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizScope {
  East,
  West,
  Mixed,
  Article,
}

/// Localized pair of strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Localized<T> {
  pub en: T,
  pub uz: T,
}

impl<T> Localized<T> {
  pub fn get(&self, lang: Lang) -> &T {
    match lang {
      Lang::En => &self.en,
      Lang::Uz => &self.uz,
    }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
  pub slug: String,
  pub region: Region,
  pub school: String,
  pub title: Localized<String>,
  pub summary: Localized<String>,
  pub content: Localized<String>,
  pub key_takeaways: Localized<Vec<String>>,
  #[serde(default)]
  pub concepts: Vec<String>,
  pub reading_time: u32,
  /// Negative years are BCE.
  pub timeline_year: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Philosopher {
  pub slug: String,
  pub name: String,
  pub region: Region,
  pub era: String,
  pub school: String,
  pub bio: Localized<String>,
  pub key_ideas: Localized<Vec<String>>,
  pub quote: Localized<String>,
  /// Article slugs; not checked against the article catalog.
  #[serde(default)]
  pub related_articles: Vec<String>,
  pub timeline_year: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Concept {
  pub slug: String,
  pub name: Localized<String>,
  pub region: ConceptRegion,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
  MultipleChoice,
  TrueFalse,
  ShortAnswer,
}

/// An answer on the wire: either a native boolean or free text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
  Bool(bool),
  Text(String),
}

impl Default for AnswerValue {
  fn default() -> Self {
    AnswerValue::Text(String::new())
  }
}

impl fmt::Display for AnswerValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AnswerValue::Bool(b) => write!(f, "{}", b),
      AnswerValue::Text(s) => f.write_str(s),
    }
  }
}

impl From<bool> for AnswerValue {
  fn from(b: bool) -> Self {
    AnswerValue::Bool(b)
  }
}

impl From<&str> for AnswerValue {
  fn from(s: &str) -> Self {
    AnswerValue::Text(s.to_string())
  }
}

impl From<String> for AnswerValue {
  fn from(s: String) -> Self {
    AnswerValue::Text(s)
  }
}

/// A question as delivered to clients and as accepted by the grader.
///
/// Generated questions carry `sourceArticleTitle` + `sourceSection`; curated bank questions
/// additionally carry aliases, the article slug and a longer context for explanations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: QuestionType,
  pub prompt: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub options: Option<Vec<String>>,
  pub correct_answer: AnswerValue,
  #[serde(default)]
  pub explanation: String,
  #[serde(default)]
  pub source_article_title: String,
  #[serde(default)]
  pub source_section: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub accepted_answers: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_article_slug: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub explanation_context: Option<String>,
}

/// Client's quiz request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSetup {
  #[serde(default)]
  pub language: Lang,
  pub scope: QuizScope,
  pub difficulty: Difficulty,
  pub question_count: usize,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub article_slug: Option<String>,
}

/// Allowed values for `QuizSetup::question_count`.
pub const QUESTION_COUNTS: [usize; 3] = [5, 10, 20];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizEvaluationItem {
  pub question: Question,
  pub user_answer: AnswerValue,
  pub is_correct: bool,
}

/// One graded attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
  pub id: String,
  pub created_at: String,
  pub setup: QuizSetup,
  pub score: u32,
  pub correct_count: usize,
  pub incorrect_count: usize,
  pub items: Vec<QuizEvaluationItem>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn answer_value_untagged() {
    let b: AnswerValue = serde_json::from_value(json!(true)).unwrap();
    assert_eq!(b, AnswerValue::Bool(true));
    let t: AnswerValue = serde_json::from_value(json!("Ren")).unwrap();
    assert_eq!(t, AnswerValue::Text("Ren".into()));
    assert_eq!(AnswerValue::Bool(false).to_string(), "false");
  }

  #[test]
  fn setup_parses_camel_case() {
    let setup: QuizSetup = serde_json::from_value(json!({
      "language": "uz",
      "scope": "article",
      "difficulty": "hard",
      "questionCount": 10,
      "articleSlug": "daoism-natural-harmony"
    }))
    .unwrap();
    assert_eq!(setup.language, Lang::Uz);
    assert_eq!(setup.scope, QuizScope::Article);
    assert_eq!(setup.article_slug.as_deref(), Some("daoism-natural-harmony"));
  }

  #[test]
  fn question_serializes_type_field() {
    let q = Question {
      id: "q1".into(),
      kind: QuestionType::ShortAnswer,
      prompt: "?".into(),
      options: None,
      correct_answer: "Daoism".into(),
      explanation: String::new(),
      source_article_title: "T".into(),
      source_section: "S".into(),
      accepted_answers: vec![],
      source_article_slug: None,
      explanation_context: None,
    };
    let v = serde_json::to_value(&q).unwrap();
    assert_eq!(v["type"], "short_answer");
    assert!(v.get("options").is_none());
    assert_eq!(v["correctAnswer"], "Daoism");
  }

  #[test]
  fn lang_loose() {
    assert_eq!(Lang::from_loose(Some("uz")), Lang::Uz);
    assert_eq!(Lang::from_loose(Some("UZ")), Lang::En);
    assert_eq!(Lang::from_loose(None), Lang::En);
  }
}
