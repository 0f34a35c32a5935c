//! Tests for research types.

use proptest::prelude::*;

use super::{ResearchHit, normalize_query};

#[test]
fn normalize_collapses_whitespace_and_case() {
  assert_eq!(normalize_query("  Rust   Async\tRuntimes \n"), "rust async runtimes");
}

#[test]
fn normalize_empty_is_empty() {
  assert_eq!(normalize_query("   "), "");
}

#[test]
fn hit_deserializes_with_only_title() {
  let hit: ResearchHit = serde_json::from_str(r#"{"title":"Paper"}"#).unwrap();
  assert_eq!(hit, ResearchHit::titled("Paper"));
}

proptest! {
  #[test]
  fn normalize_is_idempotent(q in "[ a-zA-Z0-9\t]{0,40}") {
    let once = normalize_query(&q);
    prop_assert_eq!(normalize_query(&once), once.clone());
    prop_assert!(!once.starts_with(' ') && !once.ends_with(' '));
    prop_assert!(!once.contains("  "));
  }
}
