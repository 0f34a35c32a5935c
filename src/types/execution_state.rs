//! Execution state threaded through the analysis pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Result recorded for one completed node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
  /// Name of the node that produced this result.
  pub node: String,
  /// Node-defined JSON payload.
  pub output: serde_json::Value,
  /// Iteration of the session in which the node ran.
  pub iteration: u32,
  pub completed_at: DateTime<Utc>,
}

/// A non-fatal failure recorded during a run (e.g. research enrichment that was unavailable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunError {
  pub node: String,
  pub message: String,
  pub at: DateTime<Utc>,
}

impl RunError {
  pub fn new(node: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      node: node.into(),
      message: message.into(),
      at: Utc::now(),
    }
  }
}

/// Mutable payload of one analysis session.
///
/// The results log is ordered by first completion. Recording a node that already has an
/// entry replaces that entry in place; entries of other nodes are never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
  pub session_id: String,
  /// Logical key of the analysed document (path- or content-derived).
  pub document_key: String,
  /// Content fingerprint of the document at the time of the last run, if known.
  #[serde(default)]
  pub document_fingerprint: Option<String>,
  #[serde(default)]
  pub results: Vec<NodeResult>,
  /// Incremented on each refinement run; 0 for the initial analysis.
  #[serde(default)]
  pub iteration: u32,
  #[serde(default)]
  pub errors: Vec<RunError>,
  /// Node currently executing, or the last one that ran.
  #[serde(default)]
  pub current_node: Option<String>,
}

impl ExecutionState {
  pub fn new(session_id: impl Into<String>, document_key: impl Into<String>) -> Self {
    Self {
      session_id: session_id.into(),
      document_key: document_key.into(),
      document_fingerprint: None,
      results: Vec::new(),
      iteration: 0,
      errors: Vec::new(),
      current_node: None,
    }
  }

  /// Records `output` for `node`, overwriting a prior entry for the same node.
  #[instrument(level = "trace", skip(self, output))]
  pub fn record_result(&mut self, node: &str, output: serde_json::Value) {
    let entry = NodeResult {
      node: node.to_string(),
      output,
      iteration: self.iteration,
      completed_at: Utc::now(),
    };
    match self.results.iter_mut().find(|r| r.node == node) {
      Some(existing) => *existing = entry,
      None => self.results.push(entry),
    }
  }

  pub fn result(&self, node: &str) -> Option<&NodeResult> {
    self.results.iter().find(|r| r.node == node)
  }

  /// Node names with a recorded result, in log order.
  pub fn completed_nodes(&self) -> Vec<&str> {
    self.results.iter().map(|r| r.node.as_str()).collect()
  }

  pub fn push_error(&mut self, error: RunError) {
    self.errors.push(error);
  }
}
