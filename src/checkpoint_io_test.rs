//! Tests for checkpoint save/load.

use crate::checkpoint_io::{CHECKPOINT_FILENAME, load_checkpoint, save_checkpoint};
use crate::types::{Checkpoint, ExecutionState};
use serde_json::json;

fn checkpoint(position: &str) -> Checkpoint {
  let mut state = ExecutionState::new("sess", "doc.md");
  state.record_result("ingest", json!({"k": "v"}));
  Checkpoint::new(state, position)
}

#[test]
fn roundtrip_save_load() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("sess").join(CHECKPOINT_FILENAME);
  let cp = checkpoint("ingest");
  save_checkpoint(&path, &cp).unwrap();
  assert!(path.exists());
  let loaded = load_checkpoint(&path).unwrap();
  assert_eq!(loaded, cp);
}

#[test]
fn save_overwrites_and_leaves_no_temp_file() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join(CHECKPOINT_FILENAME);
  save_checkpoint(&path, &checkpoint("a")).unwrap();
  save_checkpoint(&path, &checkpoint("b")).unwrap();
  assert_eq!(load_checkpoint(&path).unwrap().position, "b");
  let names: Vec<_> = std::fs::read_dir(dir.path())
    .unwrap()
    .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
    .collect();
  assert_eq!(names, vec![CHECKPOINT_FILENAME.to_string()]);
}

#[test]
fn load_missing_file_returns_error() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("nonexistent.json");
  let r = load_checkpoint(&path);
  assert_eq!(r.unwrap_err().kind(), std::io::ErrorKind::NotFound);
}

#[test]
fn load_corrupt_file_is_invalid_data() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join(CHECKPOINT_FILENAME);
  std::fs::write(&path, b"{not json").unwrap();
  let r = load_checkpoint(&path);
  assert_eq!(r.unwrap_err().kind(), std::io::ErrorKind::InvalidData);
}
