//! Error types for the orchestrator, checkpoint store and pipeline graph.
//!
//! Research failures have their own type ([crate::bridge::BridgeError]) because they never
//! abort a run: nodes record them as [crate::types::RunError]s instead.

use thiserror::Error;

use crate::types::ExecutionState;

/// Checkpoint persistence failure. Fatal for `save`; `load` degrades to "no checkpoint".
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("checkpoint I/O error: {0}")]
  Io(#[from] std::io::Error),
  #[error("checkpoint encoding error: {0}")]
  Encode(#[from] serde_json::Error),
  #[error("invalid session id: {0:?}")]
  InvalidSessionId(String),
}

/// Invalid pipeline graph definition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
  #[error("pipeline graph has no nodes")]
  Empty,
  #[error("duplicate node name: {0}")]
  DuplicateNode(String),
  #[error("node '{node}' depends on unknown node '{dependency}'")]
  UnknownDependency { node: String, dependency: String },
  #[error("dependency cycle among nodes: {0:?}")]
  Cycle(Vec<String>),
}

/// Errors surfaced to callers of the controller and orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
  #[error("document not found: {0}")]
  DocumentNotFound(String),

  #[error("I/O error ({context}): {source}")]
  Io {
    context: String,
    #[source]
    source: std::io::Error,
  },

  #[error("checkpoint store failure: {0}")]
  Checkpoint(#[from] StoreError),

  /// A pipeline stage failed. State up to the previous node remains checkpointed.
  #[error("node '{node}' failed in session {session_id}: {cause}")]
  NodeFailed {
    session_id: String,
    node: String,
    cause: String,
  },

  /// The run stopped at a node boundary on request. Not a failure; resume to continue.
  #[error("run interrupted in session {session_id} (last completed: {last_completed:?})")]
  Interrupted {
    session_id: String,
    last_completed: Option<String>,
    state: Box<ExecutionState>,
  },

  #[error("no checkpoint found for session {0}")]
  NoCheckpointFound(String),

  #[error("no prior analysis for document {0}")]
  NoPriorAnalysis(String),

  #[error("execution state has no session id")]
  MissingSessionKey,

  #[error("unknown node: {0}")]
  UnknownNode(String),

  #[error("unknown research provider: {0}")]
  UnknownProvider(String),

  #[error("a run is already in progress on this controller")]
  RunInProgress,

  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error("configuration error: {0}")]
  Config(String),
}

impl OrchestratorError {
  /// True when the session's checkpoint is intact and a later run can pick up from it.
  pub fn is_resumable(&self) -> bool {
    matches!(
      self,
      OrchestratorError::Interrupted { .. }
        | OrchestratorError::NodeFailed { .. }
        | OrchestratorError::Checkpoint(_)
    )
  }

  pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
    OrchestratorError::Io {
      context: context.into(),
      source,
    }
  }
}
