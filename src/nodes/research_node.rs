//! Research stage: fans the document query out to the selected providers through the bridge.
//!
//! Provider failures never fail the node. Each one becomes a warning (and thus a
//! [crate::types::RunError]) plus a progress warning, and the remaining providers' hits are
//! kept.

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};

use crate::graph::{AnalysisNode, NodeContext, NodeFailure, NodeOutput};
use crate::nodes::ingest_node::{DEFAULT_QUERY_WORDS, derive_query};
use crate::types::{ExecutionState, ResearchRequest};

pub struct ResearchNode {
  name: String,
  /// Node whose `query` output field is used as the search query.
  query_from: String,
}

impl ResearchNode {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      query_from: "ingest".to_string(),
    }
  }

  pub fn query_from(mut self, node: impl Into<String>) -> Self {
    self.query_from = node.into();
    self
  }

  fn query(&self, state: &ExecutionState, ctx: &NodeContext<'_>) -> Option<String> {
    let upstream = state
      .result(&self.query_from)
      .and_then(|r| r.output.get("query"))
      .and_then(Value::as_str)
      .filter(|q| !q.trim().is_empty())
      .map(str::to_string);
    upstream.or_else(|| {
      ctx
        .document
        .map(|d| derive_query(&d.content, DEFAULT_QUERY_WORDS))
        .filter(|q| !q.trim().is_empty())
    })
  }
}

impl Default for ResearchNode {
  fn default() -> Self {
    Self::new("research")
  }
}

#[async_trait]
impl AnalysisNode for ResearchNode {
  fn name(&self) -> &str {
    &self.name
  }

  #[instrument(level = "trace", skip(self, state, ctx), fields(session_id = %ctx.session_id))]
  async fn invoke(
    &self,
    state: &ExecutionState,
    ctx: &NodeContext<'_>,
  ) -> Result<NodeOutput, NodeFailure> {
    let Some(query) = self.query(state, ctx) else {
      return Ok(
        NodeOutput::new(json!({ "query": null, "results": {} }))
          .with_warning("no research query available"),
      );
    };
    let bridge = match ctx.bridge {
      Some(bridge) if !ctx.providers.is_empty() => bridge,
      _ => {
        ctx.progress.info("no research providers selected");
        return Ok(NodeOutput::new(json!({ "query": query, "results": {} })));
      }
    };

    let requests: Vec<ResearchRequest> = ctx
      .providers
      .iter()
      .map(|p| ResearchRequest::new(p.as_str(), query.as_str(), ctx.session_id))
      .collect();
    let answers = join_all(requests.iter().map(|r| bridge.fetch(r))).await;

    let mut results = Map::new();
    let mut warnings = Vec::new();
    for (request, answer) in requests.iter().zip(answers) {
      match answer {
        Ok(result) => {
          debug!(
            provider = %request.provider,
            hits = result.hits.len(),
            cache_hit = result.cache_hit,
            "research answered"
          );
          results.insert(
            request.provider.clone(),
            json!({ "hits": result.hits, "cache_hit": result.cache_hit }),
          );
        }
        Err(e) => {
          let message = format!("research via '{}' failed: {e}", request.provider);
          ctx.progress.warn(message.clone());
          warnings.push(message);
        }
      }
    }
    ctx.progress.info(format!(
      "research: {} of {} providers answered",
      results.len(),
      requests.len()
    ));

    Ok(NodeOutput {
      result: json!({ "query": query, "results": results }),
      warnings,
    })
  }
}
