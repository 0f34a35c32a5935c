//! Tests for `ExecutionState`.

use serde_json::json;

use super::{ExecutionState, RunError};

#[test]
fn record_result_appends_in_order() {
  let mut state = ExecutionState::new("s1", "doc.md");
  state.record_result("a", json!({"n": 1}));
  state.record_result("b", json!({"n": 2}));
  assert_eq!(state.completed_nodes(), vec!["a", "b"]);
  assert_eq!(state.result("b").map(|r| r.output.clone()), Some(json!({"n": 2})));
}

#[test]
fn record_result_overwrites_in_place() {
  let mut state = ExecutionState::new("s1", "doc.md");
  state.record_result("a", json!(1));
  state.record_result("b", json!(2));
  state.record_result("c", json!(3));
  state.iteration = 1;
  state.record_result("b", json!("again"));
  assert_eq!(state.completed_nodes(), vec!["a", "b", "c"]);
  let b = state.result("b").unwrap();
  assert_eq!(b.output, json!("again"));
  assert_eq!(b.iteration, 1);
  assert_eq!(state.result("a").unwrap().output, json!(1));
}

#[test]
fn result_missing_node_is_none() {
  let state = ExecutionState::new("s1", "doc.md");
  assert!(state.result("nope").is_none());
  assert!(state.completed_nodes().is_empty());
}

#[test]
fn serde_roundtrip_preserves_state() {
  let mut state = ExecutionState::new("s1", "doc.md");
  state.document_fingerprint = Some("abc".to_string());
  state.record_result("a", json!({"words": 12}));
  state.push_error(RunError::new("a", "research unavailable"));
  state.current_node = Some("a".to_string());
  let json = serde_json::to_string(&state).unwrap();
  let back: ExecutionState = serde_json::from_str(&json).unwrap();
  assert_eq!(back, state);
}

#[test]
fn deserialize_tolerates_missing_optional_fields() {
  let back: ExecutionState =
    serde_json::from_str(r#"{"session_id":"s","document_key":"k"}"#).unwrap();
  assert_eq!(back.iteration, 0);
  assert!(back.results.is_empty());
  assert!(back.current_node.is_none());
}
