//! Tests for the ingest stage.

use crate::document::Document;
use crate::graph::{AnalysisNode, NodeContext};
use crate::interrupt::InterruptHandle;
use crate::nodes::IngestNode;
use crate::nodes::ingest_node::{derive_query, extract_title};
use crate::progress::ProgressBus;
use crate::types::ExecutionState;

#[test]
fn title_is_first_non_empty_line_without_heading_markers() {
  assert_eq!(
    extract_title("\n\n## Async Rust  \nbody").as_deref(),
    Some("Async Rust")
  );
  assert_eq!(extract_title("   \n\t"), None);
  assert_eq!(extract_title("###\nx"), None);
}

#[test]
fn query_falls_back_to_leading_words() {
  assert_eq!(derive_query("# Tokio internals\nmore", 2), "Tokio internals");
  assert_eq!(derive_query("###\none two three", 2), "one two");
}

async fn ingest(content: &str) -> crate::graph::NodeOutput {
  let doc = Document::new("doc", content);
  let interrupt = InterruptHandle::new();
  let ctx = NodeContext {
    session_id: "s",
    document: Some(&doc),
    bridge: None,
    providers: &[],
    progress: ProgressBus::new().emitter("s", "ingest"),
    interrupt: &interrupt,
  };
  IngestNode::default()
    .invoke(&ExecutionState::new("s", "doc"), &ctx)
    .await
    .unwrap()
}

#[tokio::test]
async fn ingest_reports_counts_and_query() {
  let out = ingest("# Rate limiting\nToken buckets refill lazily.\n").await;
  assert_eq!(out.result["title"], "Rate limiting");
  assert_eq!(out.result["query"], "Rate limiting");
  assert_eq!(out.result["words"], 7);
  assert_eq!(out.result["lines"], 2);
  assert_eq!(
    out.result["fingerprint"],
    crate::document::fingerprint("# Rate limiting\nToken buckets refill lazily.\n")
  );
  assert!(out.warnings.is_empty());
}

#[tokio::test]
async fn empty_document_is_a_warning_not_a_failure() {
  let out = ingest("").await;
  assert_eq!(out.result["words"], 0);
  assert_eq!(out.warnings, vec!["document is empty".to_string()]);
}

#[tokio::test]
async fn missing_document_fails() {
  let interrupt = InterruptHandle::new();
  let ctx = NodeContext {
    session_id: "s",
    document: None,
    bridge: None,
    providers: &[],
    progress: ProgressBus::new().emitter("s", "ingest"),
    interrupt: &interrupt,
  };
  assert!(
    IngestNode::default()
      .invoke(&ExecutionState::new("s", "doc"), &ctx)
      .await
      .is_err()
  );
}
