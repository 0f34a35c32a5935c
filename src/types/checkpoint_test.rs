//! Tests for `Checkpoint`.

use serde_json::json;

use super::{CHECKPOINT_VERSION, Checkpoint, ExecutionState};

#[test]
fn new_copies_session_id_from_state() {
  let state = ExecutionState::new("sess-1", "doc.md");
  let cp = Checkpoint::new(state, "ingest");
  assert_eq!(cp.session_id, "sess-1");
  assert_eq!(cp.position, "ingest");
  assert_eq!(cp.version, CHECKPOINT_VERSION);
}

#[test]
fn checkpoint_roundtrip_serde() {
  let mut state = ExecutionState::new("sess-1", "doc.md");
  state.record_result("ingest", json!({"words": 3}));
  let cp = Checkpoint::new(state, "ingest");
  let json = serde_json::to_string(&cp).unwrap();
  let cp2: Checkpoint = serde_json::from_str(&json).unwrap();
  assert_eq!(cp2, cp);
}
