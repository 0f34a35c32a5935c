//! Tests for `ControllerState`.

use super::ControllerState;

#[test]
fn default_is_idle() {
  assert_eq!(ControllerState::default(), ControllerState::Idle);
}

#[test]
fn terminal_states() {
  assert!(!ControllerState::Idle.is_terminal());
  assert!(
    !ControllerState::Running {
      node: "a".to_string()
    }
    .is_terminal()
  );
  assert!(ControllerState::Completed.is_terminal());
  assert!(
    ControllerState::Interrupted {
      last_completed: None
    }
    .is_terminal()
  );
}

#[test]
fn display_formats() {
  let s = ControllerState::Interrupted {
    last_completed: Some("b".to_string()),
  };
  assert_eq!(s.to_string(), "interrupted(after b)");
  let f = ControllerState::Failed {
    node: "c".to_string(),
    error: "boom".to_string(),
  };
  assert_eq!(f.to_string(), "failed(c: boom)");
}
