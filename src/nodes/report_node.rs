//! Report stage: folds the upstream results into one summary object.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::graph::{AnalysisNode, NodeContext, NodeFailure, NodeOutput};
use crate::types::ExecutionState;

pub struct ReportNode {
  name: String,
}

impl ReportNode {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into() }
  }
}

impl Default for ReportNode {
  fn default() -> Self {
    Self::new("report")
  }
}

/// Total hits across every `results.<provider>.hits` array in any upstream output.
pub(crate) fn count_hits(state: &ExecutionState) -> usize {
  state
    .results
    .iter()
    .filter_map(|r| r.output.get("results").and_then(Value::as_object))
    .flat_map(|providers| providers.values())
    .filter_map(|p| p.get("hits").and_then(Value::as_array))
    .map(Vec::len)
    .sum()
}

#[async_trait]
impl AnalysisNode for ReportNode {
  fn name(&self) -> &str {
    &self.name
  }

  async fn invoke(
    &self,
    state: &ExecutionState,
    _ctx: &NodeContext<'_>,
  ) -> Result<NodeOutput, NodeFailure> {
    let sections: Vec<&str> = state
      .completed_nodes()
      .into_iter()
      .filter(|n| *n != self.name)
      .collect();
    let title = state
      .results
      .iter()
      .find_map(|r| r.output.get("title").and_then(Value::as_str));
    let hits = count_hits(state);
    let summary = format!(
      "{} ({} sections, {} research hits, {} warnings, iteration {})",
      title.unwrap_or(state.document_key.as_str()),
      sections.len(),
      hits,
      state.errors.len(),
      state.iteration
    );
    Ok(NodeOutput::new(json!({
      "document": state.document_key,
      "iteration": state.iteration,
      "sections": sections,
      "research_hits": hits,
      "warnings": state.errors.len(),
      "summary": summary,
    })))
  }
}
