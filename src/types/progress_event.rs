//! Progress notifications emitted by the controller.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
  Info,
  Warning,
  Error,
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Severity::Info => write!(f, "info"),
      Severity::Warning => write!(f, "warning"),
      Severity::Error => write!(f, "error"),
    }
  }
}

/// What transition an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressKind {
  RunStarted,
  NodeStarted,
  NodeCompleted,
  NodeFailed,
  RunCompleted,
  RunInterrupted,
  /// Free-form message from inside a node (e.g. degraded research).
  Message,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
  pub session_id: String,
  pub kind: ProgressKind,
  /// Originating node, if the event belongs to one.
  pub node: Option<String>,
  pub message: String,
  pub severity: Severity,
  pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
  pub fn new(
    session_id: impl Into<String>,
    kind: ProgressKind,
    node: Option<&str>,
    message: impl Into<String>,
    severity: Severity,
  ) -> Self {
    Self {
      session_id: session_id.into(),
      kind,
      node: node.map(str::to_string),
      message: message.into(),
      severity,
      timestamp: Utc::now(),
    }
  }

  pub fn info(
    session_id: impl Into<String>,
    kind: ProgressKind,
    node: Option<&str>,
    message: impl Into<String>,
  ) -> Self {
    Self::new(session_id, kind, node, message, Severity::Info)
  }
}
