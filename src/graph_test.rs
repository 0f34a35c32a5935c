//! Tests for `PipelineGraph` construction and ordering.

use std::sync::Arc;

use crate::error::GraphError;
use crate::graph::{AnalysisNode, PipelineGraph};
use crate::nodes::FnNode;

fn node(name: &str) -> Arc<dyn AnalysisNode> {
  Arc::new(FnNode::returning(name, serde_json::json!(name)))
}

#[test]
fn sequence_keeps_given_order() {
  let g = PipelineGraph::sequence(vec![node("a"), node("b"), node("c")]).unwrap();
  assert_eq!(g.order(), vec!["a", "b", "c"]);
  assert_eq!(g.entry(), "a");
  assert_eq!(g.terminal(), "c");
  assert_eq!(g.position("b"), Some(1));
  assert_eq!(g.next_after("b"), Some("c"));
  assert_eq!(g.next_after("c"), None);
  assert_eq!(g.next_after("zzz"), None);
  assert_eq!(g.len(), 3);
}

#[test]
fn dependencies_reorder_nodes() {
  let g = PipelineGraph::builder()
    .node_after(node("report"), &["research", "ingest"])
    .node_after(node("research"), &["ingest"])
    .node(node("ingest"))
    .build()
    .unwrap();
  assert_eq!(g.order(), vec!["ingest", "research", "report"]);
}

#[test]
fn independent_nodes_keep_insertion_order() {
  let g = PipelineGraph::builder()
    .node(node("x"))
    .node(node("y"))
    .node_after(node("z"), &["y"])
    .build()
    .unwrap();
  assert_eq!(g.order(), vec!["x", "y", "z"]);
}

#[test]
fn invalid_graphs_are_rejected() {
  assert_eq!(PipelineGraph::sequence(vec![]).unwrap_err(), GraphError::Empty);
  assert_eq!(
    PipelineGraph::sequence(vec![node("a"), node("a")]).unwrap_err(),
    GraphError::DuplicateNode("a".into())
  );
  assert_eq!(
    PipelineGraph::builder()
      .node_after(node("a"), &["ghost"])
      .build()
      .unwrap_err(),
    GraphError::UnknownDependency {
      node: "a".into(),
      dependency: "ghost".into()
    }
  );
  let err = PipelineGraph::builder()
    .node(node("root"))
    .node_after(node("a"), &["b"])
    .node_after(node("b"), &["a"])
    .build()
    .unwrap_err();
  assert_eq!(err, GraphError::Cycle(vec!["a".into(), "b".into()]));
}

#[test]
fn interrupt_handle_clones_share_flag() {
  let handle = crate::interrupt::InterruptHandle::new();
  let other = handle.clone();
  assert!(!other.is_interrupted());
  handle.interrupt();
  handle.interrupt();
  assert!(other.is_interrupted());
  other.reset();
  assert!(!handle.is_interrupted());
}

#[test]
fn built_in_pipeline_orders_ingest_research_report() {
  let g = crate::graphs::analysis_pipeline().unwrap();
  assert_eq!(g.order(), vec!["ingest", "research", "report"]);
}
