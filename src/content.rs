//! Read-only content index: slug lookups, region filters and localized accessors.
//!
//! Built once at startup and shared behind an `Arc`; nothing here mutates after construction.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::domain::{Article, Concept, Lang, Philosopher, Question, Region};
use crate::seeds::{builtin_content, parse_bundle, ContentBundle};
use crate::util::unique;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineKind {
    Article,
    Philosopher,
}

/// One point on the timeline view.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub kind: TimelineKind,
    pub slug: String,
    pub title: String,
    pub region: Region,
    pub school: String,
    pub year: i32,
}

#[derive(Clone, Debug, Default)]
pub struct ContentIndex {
    articles: Vec<Article>,
    philosophers: Vec<Philosopher>,
    concepts: Vec<Concept>,
    article_by_slug: HashMap<String, usize>,
    philosopher_by_slug: HashMap<String, usize>,
    concept_by_slug: HashMap<String, usize>,
    bank_en: Vec<Question>,
    bank_uz: Vec<Question>,
}

impl ContentIndex {
    pub fn from_bundle(bundle: ContentBundle) -> Self {
        let ContentBundle { articles, philosophers, concepts, questions } = bundle;

        // First occurrence wins on duplicate slugs.
        let mut article_by_slug = HashMap::new();
        for (i, a) in articles.iter().enumerate() {
            article_by_slug.entry(a.slug.clone()).or_insert(i);
        }
        let mut philosopher_by_slug = HashMap::new();
        for (i, p) in philosophers.iter().enumerate() {
            philosopher_by_slug.entry(p.slug.clone()).or_insert(i);
        }
        let mut concept_by_slug = HashMap::new();
        for (i, c) in concepts.iter().enumerate() {
            concept_by_slug.entry(c.slug.clone()).or_insert(i);
        }

        let mut index = Self {
            articles,
            philosophers,
            concepts,
            article_by_slug,
            philosopher_by_slug,
            concept_by_slug,
            bank_en: Vec::new(),
            bank_uz: Vec::new(),
        };

        for bq in questions {
            let mut q = bq.question;
            if q.source_article_title.is_empty() {
                if let Some(slug) = q.source_article_slug.as_deref() {
                    q.source_article_title = index.article_title(slug, bq.lang);
                }
            }
            match bq.lang {
                Lang::En => index.bank_en.push(q),
                Lang::Uz => index.bank_uz.push(q),
            }
        }
        index
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn philosophers(&self) -> &[Philosopher] {
        &self.philosophers
    }

    pub fn concepts(&self) -> &[Concept] {
        &self.concepts
    }

    pub fn article(&self, slug: &str) -> Option<&Article> {
        self.article_by_slug.get(slug).map(|&i| &self.articles[i])
    }

    pub fn philosopher(&self, slug: &str) -> Option<&Philosopher> {
        self.philosopher_by_slug.get(slug).map(|&i| &self.philosophers[i])
    }

    /// All articles, or only those of one region.
    pub fn articles_in(&self, region: Option<Region>) -> Vec<&Article> {
        self.articles
            .iter()
            .filter(|a| region.map_or(true, |r| a.region == r))
            .collect()
    }

    pub fn philosophers_in(&self, region: Option<Region>) -> Vec<&Philosopher> {
        self.philosophers
            .iter()
            .filter(|p| region.map_or(true, |r| p.region == r))
            .collect()
    }

    /// Localized concept name; unknown slugs come back unchanged.
    pub fn concept_name(&self, slug: &str, lang: Lang) -> String {
        match self.concept_by_slug.get(slug) {
            Some(&i) => self.concepts[i].name.get(lang).clone(),
            None => slug.to_string(),
        }
    }

    /// Localized article title; unknown slugs come back unchanged.
    pub fn article_title(&self, slug: &str, lang: Lang) -> String {
        match self.article(slug) {
            Some(a) => a.title.get(lang).clone(),
            None => slug.to_string(),
        }
    }

    /// Distinct schools across the whole catalog, in dataset order.
    pub fn all_schools(&self) -> Vec<String> {
        unique(self.articles.iter().map(|a| a.school.clone()))
    }

    pub fn all_philosopher_names(&self) -> Vec<String> {
        unique(self.philosophers.iter().map(|p| p.name.clone()))
    }

    /// Articles then philosophers, stably ordered by year.
    pub fn timeline(&self, lang: Lang) -> Vec<TimelineEvent> {
        let mut events: Vec<TimelineEvent> = self
            .articles
            .iter()
            .map(|a| TimelineEvent {
                kind: TimelineKind::Article,
                slug: a.slug.clone(),
                title: a.title.get(lang).clone(),
                region: a.region,
                school: a.school.clone(),
                year: a.timeline_year,
            })
            .chain(self.philosophers.iter().map(|p| TimelineEvent {
                kind: TimelineKind::Philosopher,
                slug: p.slug.clone(),
                title: p.name.clone(),
                region: p.region,
                school: p.school.clone(),
                year: p.timeline_year,
            }))
            .collect();
        events.sort_by_key(|e| e.year);
        events
    }

    /// Curated questions for one language.
    pub fn bank(&self, lang: Lang) -> &[Question] {
        match lang {
            Lang::En => &self.bank_en,
            Lang::Uz => &self.bank_uz,
        }
    }
}

/// Load the catalog from `CONTENT_PATH` when set, falling back to the built-in dataset.
#[instrument(level = "info")]
pub fn load_content(path: Option<&str>) -> ContentIndex {
    let bundle = match path {
        None => builtin_content(),
        Some(path) => match std::fs::read_to_string(path) {
            Ok(raw) => match parse_bundle(&raw) {
                Ok(bundle) => {
                    info!(target: "dualium_backend", %path, "Loaded content (TOML)");
                    bundle
                }
                Err(e) => {
                    error!(target: "dualium_backend", %path, error = %e, "Failed to parse content TOML; using built-in content");
                    builtin_content()
                }
            },
            Err(e) => {
                error!(target: "dualium_backend", %path, error = %e, "Failed to read content file; using built-in content");
                builtin_content()
            }
        },
    };

    let index = ContentIndex::from_bundle(bundle);
    if index.articles().is_empty() {
        warn!(target: "dualium_backend", "Content catalog is empty; quizzes will be empty");
    }
    info!(
        target: "dualium_backend",
        articles = index.articles().len(),
        philosophers = index.philosophers().len(),
        concepts = index.concepts().len(),
        bank_en = index.bank(Lang::En).len(),
        bank_uz = index.bank(Lang::Uz).len(),
        "Content inventory"
    );
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> ContentIndex {
        ContentIndex::from_bundle(builtin_content())
    }

    #[test]
    fn lookups_by_slug() {
        let idx = index();
        assert_eq!(idx.article("stoicism-inner-freedom").unwrap().school, "Stoicism");
        assert_eq!(idx.philosopher("laozi").unwrap().name, "Laozi");
        assert!(idx.article("nope").is_none());
    }

    #[test]
    fn concept_name_falls_back_to_slug() {
        let idx = index();
        assert_eq!(idx.concept_name("golden-mean", Lang::Uz), "Oltin ortalik");
        assert_eq!(idx.concept_name("unknown-concept", Lang::En), "unknown-concept");
    }

    #[test]
    fn region_filters() {
        let idx = index();
        let east = idx.articles_in(Some(Region::East));
        assert!(!east.is_empty());
        assert!(east.iter().all(|a| a.region == Region::East));
        assert_eq!(idx.articles_in(None).len(), idx.articles().len());
        assert!(idx.philosophers_in(Some(Region::West)).iter().all(|p| p.region == Region::West));
    }

    #[test]
    fn timeline_is_sorted_and_complete() {
        let idx = index();
        let events = idx.timeline(Lang::En);
        assert_eq!(events.len(), idx.articles().len() + idx.philosophers().len());
        assert!(events.windows(2).all(|w| w[0].year <= w[1].year));
    }

    #[test]
    fn bank_titles_are_filled_from_articles() {
        let idx = index();
        let q = &idx.bank(Lang::En)[0];
        assert_eq!(q.source_article_title, "Confucianism: Ethics and Ritual Harmony");
        assert!(idx.bank(Lang::Uz).iter().all(|q| !q.source_article_title.is_empty()));
    }

    #[test]
    fn schools_are_unique() {
        let idx = index();
        let schools = idx.all_schools();
        // Confucianism appears on two articles.
        assert_eq!(schools.iter().filter(|s| *s == "Confucianism").count(), 1);
    }

    #[test]
    fn missing_content_file_falls_back() {
        let idx = load_content(Some("/definitely/not/here.toml"));
        assert!(!idx.articles().is_empty());
    }
}
