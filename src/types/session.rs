//! Binding between a document and its checkpointed execution history.

use serde::{Deserialize, Serialize};

/// A session as resolved by the checkpoint store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub session_id: String,
  pub document_key: String,
  pub has_checkpoint: bool,
}

/// What callers see from `get_session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
  pub session_id: String,
  pub has_checkpoint: bool,
}

impl Session {
  /// Refinement needs a prior completed analysis.
  pub fn can_refine(&self) -> bool {
    self.has_checkpoint
  }

  pub fn info(&self) -> SessionInfo {
    SessionInfo {
      session_id: self.session_id.clone(),
      has_checkpoint: self.has_checkpoint,
    }
  }
}
