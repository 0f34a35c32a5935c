//! Tests for `FnNode`.

use serde_json::json;

use crate::graph::{AnalysisNode, NodeContext, NodeFailure};
use crate::interrupt::InterruptHandle;
use crate::nodes::FnNode;
use crate::progress::ProgressBus;
use crate::types::ExecutionState;

#[tokio::test]
async fn closure_sees_state_and_context() {
  let node = FnNode::new("echo", |state, ctx| {
    Ok(crate::graph::NodeOutput::new(json!({
      "session": ctx.session_id,
      "results": state.results.len(),
    })))
  });
  let mut state = ExecutionState::new("s1", "doc");
  state.record_result("prior", json!(null));
  let interrupt = InterruptHandle::new();
  let ctx = NodeContext {
    session_id: "s1",
    document: None,
    bridge: None,
    providers: &[],
    progress: ProgressBus::new().emitter("s1", "echo"),
    interrupt: &interrupt,
  };
  assert_eq!(node.name(), "echo");
  let out = node.invoke(&state, &ctx).await.unwrap();
  assert_eq!(out.result, json!({ "session": "s1", "results": 1 }));
  assert!(out.warnings.is_empty());
}

#[tokio::test]
async fn failing_node_reports_cause() {
  let node = FnNode::failing("boom", "disk on fire");
  let interrupt = InterruptHandle::new();
  let ctx = NodeContext {
    session_id: "s1",
    document: None,
    bridge: None,
    providers: &[],
    progress: ProgressBus::new().emitter("s1", "boom"),
    interrupt: &interrupt,
  };
  let err = node
    .invoke(&ExecutionState::new("s1", "doc"), &ctx)
    .await
    .unwrap_err();
  assert_eq!(err, NodeFailure::new("disk on fire"));
  assert_eq!(err.to_string(), "disk on fire");
}
