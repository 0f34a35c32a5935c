//! Tests for `results_io`.

use serde_json::json;

use crate::results_io::{RESULTS_FILENAME, load_results, write_results};
use crate::types::{ExecutionState, RunError};

#[test]
fn results_file_mirrors_state() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("nested").join(RESULTS_FILENAME);
  let mut state = ExecutionState::new("s1", "doc.md");
  state.iteration = 3;
  state.record_result("ingest", json!({ "words": 12 }));
  state.record_result("report", json!({ "summary": "ok" }));
  state.push_error(RunError::new("research", "web: timed out"));

  write_results(&state, &path).unwrap();
  let file = load_results(&path).unwrap();
  assert_eq!(file.session_id, "s1");
  assert_eq!(file.document_key, "doc.md");
  assert_eq!(file.iteration, 3);
  assert_eq!(file.completed_nodes, vec!["ingest", "report"]);
  assert_eq!(file.results, state.results);
  assert_eq!(file.errors, state.errors);
  assert!(!dir.path().join("nested").join("results.json.tmp").exists());
}

#[test]
fn missing_results_file_is_not_found() {
  let dir = tempfile::tempdir().unwrap();
  let err = load_results(&dir.path().join(RESULTS_FILENAME)).unwrap_err();
  assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
}
