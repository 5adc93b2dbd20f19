//! Built-in content: articles, philosophers, concepts and the curated question bank.
//!
//! The dataset ships inside the binary so the service is useful without any
//! external files. `CONTENT_PATH` can replace it (see `content::load_content`).

use serde::Deserialize;
use tracing::error;

use crate::domain::{Article, Concept, Lang, Philosopher, Question};

const BUILTIN_CONTENT: &str = include_str!("../data/content.toml");

/// Everything the content index is built from.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ContentBundle {
  #[serde(default)]
  pub articles: Vec<Article>,
  #[serde(default)]
  pub philosophers: Vec<Philosopher>,
  #[serde(default)]
  pub concepts: Vec<Concept>,
  #[serde(default)]
  pub questions: Vec<BankQuestion>,
}

/// A hand-written question tagged with the language it is written in.
#[derive(Clone, Debug, Deserialize)]
pub struct BankQuestion {
  pub lang: Lang,
  #[serde(flatten)]
  pub question: Question,
}

pub fn parse_bundle(raw: &str) -> Result<ContentBundle, toml::de::Error> {
  toml::from_str(raw)
}

/// The embedded dataset. A broken embedded file is logged and yields an empty bundle.
pub fn builtin_content() -> ContentBundle {
  match parse_bundle(BUILTIN_CONTENT) {
    Ok(bundle) => bundle,
    Err(e) => {
      error!(target: "dualium_backend", error = %e, "Built-in content failed to parse");
      ContentBundle::default()
    }
  }
}
