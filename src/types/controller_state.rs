//! Lifecycle state of the graph execution controller.

use std::fmt;

/// `Idle → Running → {Completed, Interrupted, Failed}`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ControllerState {
  #[default]
  Idle,
  Running {
    node: String,
  },
  Completed,
  Interrupted {
    last_completed: Option<String>,
  },
  Failed {
    node: String,
    error: String,
  },
}

impl ControllerState {
  pub fn is_running(&self) -> bool {
    matches!(self, ControllerState::Running { .. })
  }

  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      ControllerState::Completed
        | ControllerState::Interrupted { .. }
        | ControllerState::Failed { .. }
    )
  }
}

impl fmt::Display for ControllerState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ControllerState::Idle => write!(f, "idle"),
      ControllerState::Running { node } => write!(f, "running({node})"),
      ControllerState::Completed => write!(f, "completed"),
      ControllerState::Interrupted { last_completed } => match last_completed {
        Some(n) => write!(f, "interrupted(after {n})"),
        None => write!(f, "interrupted"),
      },
      ControllerState::Failed { node, error } => write!(f, "failed({node}: {error})"),
    }
  }
}
