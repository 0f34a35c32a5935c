//! Predefined pipelines.

use std::sync::Arc;

use crate::error::GraphError;
use crate::graph::PipelineGraph;
use crate::nodes::{IngestNode, ReportNode, ResearchNode};

/// `ingest → research → report`, the pipeline the CLI runs.
pub fn analysis_pipeline() -> Result<PipelineGraph, GraphError> {
  PipelineGraph::builder()
    .node(Arc::new(IngestNode::default()))
    .node_after(Arc::new(ResearchNode::default()), &["ingest"])
    .node_after(Arc::new(ReportNode::default()), &["ingest", "research"])
    .build()
}
