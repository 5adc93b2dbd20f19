//! In-memory leaderboard: best attempt per participant, ranked top-N view, capacity trimming.
//!
//! The store lives for the process lifetime. It is wrapped in a mutex in `AppState`,
//! so the compare-and-replace in `submit` is atomic per request.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use unicode_normalization::UnicodeNormalization;

use crate::domain::Lang;
use crate::util::{collapse_whitespace, to_iso};

pub const DEFAULT_CAPACITY: usize = 200;

#[derive(Clone, Debug, PartialEq)]
pub struct LeaderboardEntry {
    pub id: String,
    pub name: String,
    /// Lowercased `name`; one entry per key.
    pub name_key: String,
    pub score_percent: f64,
    pub correct_count: u32,
    pub total: u32,
    pub elapsed_ms: u64,
    pub lang: Lang,
    pub submitted_at: DateTime<Utc>,
}

/// What clients see: ranked, without the internal key or id.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicEntry {
    pub rank: usize,
    pub name: String,
    pub score_percent: f64,
    pub correct_count: u32,
    pub total: u32,
    pub elapsed_ms: u64,
    pub submitted_at: String,
    pub lang: Lang,
}

/// NFKC, collapse whitespace runs, trim.
pub fn normalize_name(input: &str) -> String {
    let composed: String = input.nfkc().collect();
    collapse_whitespace(&composed)
}

pub fn name_key(name: &str) -> String {
    name.to_lowercase()
}

/// `Less` means `a` ranks ahead of `b`: more correct answers, then higher score,
/// then faster, then earlier.
pub fn compare_entries(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    b.correct_count
        .cmp(&a.correct_count)
        .then_with(|| b.score_percent.total_cmp(&a.score_percent))
        .then_with(|| a.elapsed_ms.cmp(&b.elapsed_ms))
        .then_with(|| a.submitted_at.cmp(&b.submitted_at))
}

/// Strictly better; an exact tie is not an improvement.
pub fn is_better(next: &LeaderboardEntry, current: &LeaderboardEntry) -> bool {
    compare_entries(next, current) == Ordering::Less
}

#[derive(Debug)]
pub struct Leaderboard {
    best_by_key: HashMap<String, LeaderboardEntry>,
    capacity: usize,
}

impl Default for Leaderboard {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Leaderboard {
    pub fn new(capacity: usize) -> Self {
        Self { best_by_key: HashMap::new(), capacity: capacity.max(1) }
    }

    /// Keep `entry` if it is the first for its key or strictly better than the stored one.
    /// Returns whether the board changed.
    pub fn submit(&mut self, entry: LeaderboardEntry) -> bool {
        let updated = match self.best_by_key.get(&entry.name_key) {
            None => true,
            Some(current) => is_better(&entry, current),
        };
        if updated {
            debug!(target: "leaderboard", key = %entry.name_key, correct = entry.correct_count, score = entry.score_percent, "Best attempt recorded");
            self.best_by_key.insert(entry.name_key.clone(), entry);
            self.trim();
        }
        updated
    }

    fn sorted(&self) -> Vec<&LeaderboardEntry> {
        let mut entries: Vec<&LeaderboardEntry> = self.best_by_key.values().collect();
        // name_key breaks exact ties so the order never depends on map iteration.
        entries.sort_by(|a, b| compare_entries(a, b).then_with(|| a.name_key.cmp(&b.name_key)));
        entries
    }

    fn trim(&mut self) {
        if self.best_by_key.len() <= self.capacity {
            return;
        }
        let keep: HashSet<String> = self
            .sorted()
            .into_iter()
            .take(self.capacity)
            .map(|e| e.name_key.clone())
            .collect();
        let before = self.best_by_key.len();
        self.best_by_key.retain(|key, _| keep.contains(key));
        info!(target: "leaderboard", removed = before - self.best_by_key.len(), capacity = self.capacity, "Leaderboard trimmed");
    }

    pub fn top(&self, n: usize) -> Vec<PublicEntry> {
        self.sorted()
            .into_iter()
            .take(n)
            .enumerate()
            .map(|(i, e)| PublicEntry {
                rank: i + 1,
                name: e.name.clone(),
                score_percent: e.score_percent,
                correct_count: e.correct_count,
                total: e.total,
                elapsed_ms: e.elapsed_ms,
                submitted_at: to_iso(&e.submitted_at),
                lang: e.lang,
            })
            .collect()
    }

    pub fn count(&self) -> usize {
        self.best_by_key.len()
    }

    pub fn get(&self, key: &str) -> Option<&LeaderboardEntry> {
        self.best_by_key.get(key)
    }
}
