//! Checkpoint for resumable execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ExecutionState;

/// Current on-disk checkpoint format.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Durable snapshot of an [ExecutionState] plus the last node that completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
  pub version: u32,
  pub session_id: String,
  /// Last node whose result is included in `state`.
  pub position: String,
  pub saved_at: DateTime<Utc>,
  pub state: ExecutionState,
}

impl Checkpoint {
  pub fn new(state: ExecutionState, position: impl Into<String>) -> Self {
    Self {
      version: CHECKPOINT_VERSION,
      session_id: state.session_id.clone(),
      position: position.into(),
      saved_at: Utc::now(),
      state,
    }
  }
}
