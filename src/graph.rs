//! Analysis nodes and the static pipeline graph the controller walks.
//!
//! A [PipelineGraph] is a DAG of named [AnalysisNode]s flattened into one execution order at
//! build time (stable topological sort: among ready nodes, the one added first runs first).

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::instrument;

use crate::bridge::ResearchBridge;
use crate::document::Document;
use crate::error::GraphError;
use crate::interrupt::InterruptHandle;
use crate::progress::NodeEmitter;
use crate::types::ExecutionState;

/// What a node gets besides the state: collaborators for the current run.
pub struct NodeContext<'a> {
  pub session_id: &'a str,
  pub document: Option<&'a Document>,
  pub bridge: Option<&'a ResearchBridge>,
  /// Providers selected for this run.
  pub providers: &'a [String],
  pub progress: NodeEmitter,
  /// Lets long-running nodes notice a pending interruption; the controller only acts on it
  /// between nodes.
  pub interrupt: &'a InterruptHandle,
}

/// Successful node output. The controller records `result` under the node's name and
/// appends `warnings` to the state's error list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeOutput {
  pub result: serde_json::Value,
  pub warnings: Vec<String>,
}

impl NodeOutput {
  pub fn new(result: serde_json::Value) -> Self {
    Self {
      result,
      warnings: Vec::new(),
    }
  }

  pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
    self.warnings.push(warning.into());
    self
  }
}

/// Non-recoverable node error; fails the run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{cause}")]
pub struct NodeFailure {
  pub cause: String,
}

impl NodeFailure {
  pub fn new(cause: impl Into<String>) -> Self {
    Self {
      cause: cause.into(),
    }
  }
}

/// One named unit of pipeline work.
#[async_trait]
pub trait AnalysisNode: Send + Sync {
  fn name(&self) -> &str;

  /// Reads `state` and produces this node's output. Must not assume it runs only once per
  /// session: refinement and resumption re-invoke nodes.
  async fn invoke(
    &self,
    state: &ExecutionState,
    ctx: &NodeContext<'_>,
  ) -> Result<NodeOutput, NodeFailure>;
}

/// Validated, ordered pipeline.
#[derive(Clone)]
pub struct PipelineGraph {
  nodes: Vec<Arc<dyn AnalysisNode>>,
}

impl std::fmt::Debug for PipelineGraph {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PipelineGraph")
      .field("order", &self.order())
      .finish()
  }
}

impl PipelineGraph {
  pub fn builder() -> GraphBuilder {
    GraphBuilder::default()
  }

  /// Linear pipeline in the given order.
  pub fn sequence(nodes: Vec<Arc<dyn AnalysisNode>>) -> Result<Self, GraphError> {
    nodes
      .into_iter()
      .fold(GraphBuilder::default(), GraphBuilder::then)
      .build()
  }

  /// Node names in execution order.
  pub fn order(&self) -> Vec<&str> {
    self.nodes.iter().map(|n| n.name()).collect()
  }

  pub fn nodes(&self) -> &[Arc<dyn AnalysisNode>] {
    &self.nodes
  }

  pub fn position(&self, name: &str) -> Option<usize> {
    self.nodes.iter().position(|n| n.name() == name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.position(name).is_some()
  }

  pub fn entry(&self) -> &str {
    self.nodes.first().map(|n| n.name()).unwrap_or_default()
  }

  pub fn terminal(&self) -> &str {
    self.nodes.last().map(|n| n.name()).unwrap_or_default()
  }

  /// Node that runs after `name`, or `None` if `name` is terminal or unknown.
  pub fn next_after(&self, name: &str) -> Option<&str> {
    let i = self.position(name)?;
    self.nodes.get(i + 1).map(|n| n.name())
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }
}

/// Collects nodes with their dependencies.
#[derive(Default)]
pub struct GraphBuilder {
  entries: Vec<(Arc<dyn AnalysisNode>, Vec<String>)>,
}

impl GraphBuilder {
  /// Adds a node with no dependencies.
  pub fn node(mut self, node: Arc<dyn AnalysisNode>) -> Self {
    self.entries.push((node, Vec::new()));
    self
  }

  pub fn node_after(mut self, node: Arc<dyn AnalysisNode>, depends_on: &[&str]) -> Self {
    let deps = depends_on.iter().map(|d| d.to_string()).collect();
    self.entries.push((node, deps));
    self
  }

  /// Adds a node depending on the previously added one.
  pub fn then(self, node: Arc<dyn AnalysisNode>) -> Self {
    let prev = self.entries.last().map(|(n, _)| n.name().to_string());
    match prev {
      Some(prev) => self.node_after(node, &[prev.as_str()]),
      None => self.node(node),
    }
  }

  #[instrument(level = "trace", skip(self))]
  pub fn build(self) -> Result<PipelineGraph, GraphError> {
    if self.entries.is_empty() {
      return Err(GraphError::Empty);
    }
    let mut names = HashSet::new();
    for (node, _) in &self.entries {
      if !names.insert(node.name().to_string()) {
        return Err(GraphError::DuplicateNode(node.name().to_string()));
      }
    }
    for (node, deps) in &self.entries {
      if let Some(missing) = deps.iter().find(|d| !names.contains(d.as_str())) {
        return Err(GraphError::UnknownDependency {
          node: node.name().to_string(),
          dependency: missing.clone(),
        });
      }
    }

    let mut remaining = self.entries;
    let mut done: HashSet<String> = HashSet::new();
    let mut ordered = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
      let ready = remaining
        .iter()
        .position(|(_, deps)| deps.iter().all(|d| done.contains(d)));
      let Some(i) = ready else {
        return Err(GraphError::Cycle(
          remaining.iter().map(|(n, _)| n.name().to_string()).collect(),
        ));
      };
      let (node, _) = remaining.remove(i);
      done.insert(node.name().to_string());
      ordered.push(node);
    }
    Ok(PipelineGraph { nodes: ordered })
  }
}
