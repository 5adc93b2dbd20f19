//! Small utility helpers used across modules.

use std::collections::HashSet;
use std::hash::Hash;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;

/// Shuffled copy of `items` (Fisher-Yates via `SliceRandom::shuffle`).
pub fn shuffle<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
  let mut copy = items.to_vec();
  copy.shuffle(rng);
  copy
}

/// Deduplicate, keeping the first occurrence of each value in input order.
pub fn unique<T: Eq + Hash + Clone>(items: impl IntoIterator<Item = T>) -> Vec<T> {
  let mut seen = HashSet::new();
  items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}

pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
  value.max(min).min(max)
}

/// Collapse runs of whitespace into single spaces and trim both ends.
pub fn collapse_whitespace(s: &str) -> String {
  s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Lenient date parsing for client-supplied timestamps.
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS(.fff)` (read as UTC) and a bare `YYYY-MM-DD`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
  let s = raw.trim();
  if s.is_empty() {
    return None;
  }
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
      return Some(naive.and_utc());
    }
  }
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|naive| naive.and_utc())
}

/// ISO-8601 with millisecond precision and a `Z` suffix, e.g. `2024-05-01T10:00:00.000Z`.
pub fn to_iso(ts: &DateTime<Utc>) -> String {
  ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Numeric coercion for loosely typed JSON fields.
///
/// Numbers pass through, numeric strings are parsed after trimming (empty string is 0),
/// booleans become 1/0 and null becomes 0. Anything else, and any non-finite result, is `None`.
pub fn finite_number(value: Option<&Value>) -> Option<f64> {
  let n = match value? {
    Value::Number(n) => n.as_f64()?,
    Value::String(s) => {
      let t = s.trim();
      if t.is_empty() {
        0.0
      } else if t.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        // "inf", "NaN" and friends are not numbers on the wire.
        return None;
      } else {
        t.parse::<f64>().ok()?
      }
    }
    Value::Bool(b) => {
      if *b {
        1.0
      } else {
        0.0
      }
    }
    Value::Null => 0.0,
    Value::Array(_) | Value::Object(_) => return None,
  };
  n.is_finite().then_some(n)
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::{rngs::StdRng, SeedableRng};
  use serde_json::json;

  #[test]
  fn shuffle_keeps_elements() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut out = shuffle(&[1, 2, 3, 4, 5], &mut rng);
    out.sort();
    assert_eq!(out, vec![1, 2, 3, 4, 5]);
  }

  #[test]
  fn unique_keeps_first_occurrence_order() {
    assert_eq!(unique(vec!["b", "a", "b", "c", "a"]), vec!["b", "a", "c"]);
  }

  #[test]
  fn collapse_whitespace_trims_and_joins() {
    assert_eq!(collapse_whitespace("  Ana \t  Maria\n"), "Ana Maria");
  }

  #[test]
  fn timestamps() {
    let ts = parse_timestamp("2024-03-01T12:30:00Z").unwrap();
    assert_eq!(to_iso(&ts), "2024-03-01T12:30:00.000Z");
    let offset = parse_timestamp("2024-03-01T14:30:00+02:00").unwrap();
    assert_eq!(offset, ts);
    assert_eq!(to_iso(&parse_timestamp("2024-03-01").unwrap()), "2024-03-01T00:00:00.000Z");
    assert!(parse_timestamp("yesterday").is_none());
    assert!(parse_timestamp("").is_none());
  }

  #[test]
  fn number_coercion() {
    assert_eq!(finite_number(Some(&json!(90))), Some(90.0));
    assert_eq!(finite_number(Some(&json!(" 87.5 "))), Some(87.5));
    assert_eq!(finite_number(Some(&json!(""))), Some(0.0));
    assert_eq!(finite_number(Some(&json!(true))), Some(1.0));
    assert_eq!(finite_number(Some(&json!(null))), Some(0.0));
    assert_eq!(finite_number(Some(&json!("1e3"))), Some(1000.0));
    assert_eq!(finite_number(Some(&json!("abc"))), None);
    assert_eq!(finite_number(Some(&json!("Infinity"))), None);
    assert_eq!(finite_number(Some(&json!([1]))), None);
    assert_eq!(finite_number(None), None);
  }

  #[test]
  fn template_fills_every_occurrence() {
    assert_eq!(fill_template("Hi {name}, {name}!", &[("name", "Ana")]), "Hi Ana, Ana!");
    assert_eq!(fill_template("{missing}", &[]), "{missing}");
  }
}
