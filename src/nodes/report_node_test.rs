//! Tests for the report stage.

use serde_json::json;

use crate::graph::{AnalysisNode, NodeContext};
use crate::interrupt::InterruptHandle;
use crate::nodes::ReportNode;
use crate::nodes::report_node::count_hits;
use crate::progress::ProgressBus;
use crate::types::{ExecutionState, RunError};

fn state() -> ExecutionState {
  let mut state = ExecutionState::new("s", "notes.md");
  state.record_result("ingest", json!({ "title": "Notes", "query": "notes" }));
  state.record_result(
    "research",
    json!({
      "query": "notes",
      "results": {
        "web": { "hits": [{ "title": "a" }, { "title": "b" }], "cache_hit": false },
        "papers": { "hits": [{ "title": "c" }], "cache_hit": true },
      }
    }),
  );
  state.push_error(RunError::new("research", "news: timed out"));
  state
}

#[test]
fn hits_are_counted_across_providers() {
  assert_eq!(count_hits(&state()), 3);
  assert_eq!(count_hits(&ExecutionState::new("s", "d")), 0);
}

#[tokio::test]
async fn report_summarizes_upstream_results() {
  let mut state = state();
  // A previous report must not list itself as a section.
  state.record_result("report", json!({}));
  state.iteration = 2;
  let interrupt = InterruptHandle::new();
  let ctx = NodeContext {
    session_id: "s",
    document: None,
    bridge: None,
    providers: &[],
    progress: ProgressBus::new().emitter("s", "report"),
    interrupt: &interrupt,
  };
  let out = ReportNode::default().invoke(&state, &ctx).await.unwrap();
  assert_eq!(out.result["sections"], json!(["ingest", "research"]));
  assert_eq!(out.result["research_hits"], 3);
  assert_eq!(out.result["warnings"], 1);
  assert_eq!(out.result["iteration"], 2);
  assert_eq!(
    out.result["summary"],
    "Notes (2 sections, 3 research hits, 1 warnings, iteration 2)"
  );
}
