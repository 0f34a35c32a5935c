//! Final results file written after a run (`<session dir>/results.json`).

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::checkpoint_io::write_json_atomic;
use crate::types::{ExecutionState, NodeResult, RunError};

/// Default filename for results under a session directory.
pub const RESULTS_FILENAME: &str = "results.json";

/// What ends up on disk: the result log plus enough metadata to read it standalone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsFile {
  pub session_id: String,
  pub document_key: String,
  pub iteration: u32,
  pub completed_nodes: Vec<String>,
  pub results: Vec<NodeResult>,
  pub errors: Vec<RunError>,
  pub written_at: DateTime<Utc>,
}

impl ResultsFile {
  pub fn from_state(state: &ExecutionState) -> Self {
    Self {
      session_id: state.session_id.clone(),
      document_key: state.document_key.clone(),
      iteration: state.iteration,
      completed_nodes: state
        .completed_nodes()
        .into_iter()
        .map(str::to_string)
        .collect(),
      results: state.results.clone(),
      errors: state.errors.clone(),
      written_at: Utc::now(),
    }
  }
}

/// Writes the results of `state` to `path`, creating parent directories as needed.
#[instrument(level = "trace", skip(state, path), fields(session_id = %state.session_id))]
pub fn write_results(state: &ExecutionState, path: &Path) -> Result<(), std::io::Error> {
  write_json_atomic(path, &ResultsFile::from_state(state))
}

/// Reads a results file back. Returns error if missing or invalid JSON.
pub fn load_results(path: &Path) -> Result<ResultsFile, std::io::Error> {
  let bytes = std::fs::read(path)?;
  serde_json::from_slice(&bytes)
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
