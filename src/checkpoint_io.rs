//! Checkpoint save/load to a session directory (JSON).
//!
//! Writes go to a sibling temp file that is renamed over the target, so a reader sees either
//! the previous checkpoint or the new one, never a partial file.

use crate::types::Checkpoint;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Default filename for the checkpoint under a session directory.
pub const CHECKPOINT_FILENAME: &str = "checkpoint.json";

fn temp_path(path: &Path) -> PathBuf {
  let mut name = path
    .file_name()
    .map(|n| n.to_os_string())
    .unwrap_or_default();
  name.push(".tmp");
  path.with_file_name(name)
}

/// Serializes `value` as pretty JSON and atomically replaces `path` with it.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), std::io::Error> {
  let json = serde_json::to_vec_pretty(value)
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  let tmp = temp_path(path);
  {
    let mut file = std::fs::File::create(&tmp)?;
    file.write_all(&json)?;
    file.sync_all()?;
  }
  std::fs::rename(&tmp, path)
}

/// Saves a checkpoint to `path` as JSON, atomically replacing any existing file.
#[instrument(level = "trace", skip(path, cp), fields(session_id = %cp.session_id))]
pub fn save_checkpoint(path: &Path, cp: &Checkpoint) -> Result<(), std::io::Error> {
  write_json_atomic(path, cp)
}

/// Loads a checkpoint from `path`. Returns error if file is missing or invalid JSON.
#[instrument(level = "trace", skip(path))]
pub fn load_checkpoint(path: &Path) -> Result<Checkpoint, std::io::Error> {
  let bytes = std::fs::read(path)?;
  serde_json::from_slice(&bytes)
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
