//! Node backed by a closure.

use async_trait::async_trait;

use crate::graph::{AnalysisNode, NodeContext, NodeFailure, NodeOutput};
use crate::types::ExecutionState;

type NodeFn =
  dyn Fn(&ExecutionState, &NodeContext<'_>) -> Result<NodeOutput, NodeFailure> + Send + Sync;

/// Runs a synchronous closure as a pipeline stage.
pub struct FnNode {
  name: String,
  f: Box<NodeFn>,
}

impl FnNode {
  pub fn new<F>(name: impl Into<String>, f: F) -> Self
  where
    F: Fn(&ExecutionState, &NodeContext<'_>) -> Result<NodeOutput, NodeFailure> + Send + Sync + 'static,
  {
    Self {
      name: name.into(),
      f: Box::new(f),
    }
  }

  /// Node that always produces `value`.
  pub fn returning(name: impl Into<String>, value: serde_json::Value) -> Self {
    Self::new(name, move |_, _| Ok(NodeOutput::new(value.clone())))
  }

  /// Node that always fails with `cause`.
  pub fn failing(name: impl Into<String>, cause: impl Into<String>) -> Self {
    let cause = cause.into();
    Self::new(name, move |_, _| Err(NodeFailure::new(cause.clone())))
  }
}

#[async_trait]
impl AnalysisNode for FnNode {
  fn name(&self) -> &str {
    &self.name
  }

  async fn invoke(
    &self,
    state: &ExecutionState,
    ctx: &NodeContext<'_>,
  ) -> Result<NodeOutput, NodeFailure> {
    (self.f)(state, ctx)
  }
}
