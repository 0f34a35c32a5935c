//! Ingest stage: basic document statistics and the research query derived from them.

use async_trait::async_trait;
use serde_json::json;
use tracing::instrument;

use crate::graph::{AnalysisNode, NodeContext, NodeFailure, NodeOutput};
use crate::types::ExecutionState;

/// Words taken from the body when a document has no title line.
pub const DEFAULT_QUERY_WORDS: usize = 8;

pub struct IngestNode {
  name: String,
  query_words: usize,
}

/// First non-empty line, with markdown heading markers stripped.
pub(crate) fn extract_title(content: &str) -> Option<String> {
  let line = content.lines().map(str::trim).find(|l| !l.is_empty())?;
  let title = line.trim_start_matches('#').trim();
  (!title.is_empty()).then(|| title.to_string())
}

/// Query used by the research stage: the title when present, else the first `max_words` words.
pub(crate) fn derive_query(content: &str, max_words: usize) -> String {
  extract_title(content).unwrap_or_else(|| {
    content
      .split_whitespace()
      .take(max_words)
      .collect::<Vec<_>>()
      .join(" ")
  })
}

impl IngestNode {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      query_words: DEFAULT_QUERY_WORDS,
    }
  }

  pub fn with_query_words(mut self, words: usize) -> Self {
    self.query_words = words.max(1);
    self
  }
}

impl Default for IngestNode {
  fn default() -> Self {
    Self::new("ingest")
  }
}

#[async_trait]
impl AnalysisNode for IngestNode {
  fn name(&self) -> &str {
    &self.name
  }

  #[instrument(level = "trace", skip(self, _state, ctx))]
  async fn invoke(
    &self,
    _state: &ExecutionState,
    ctx: &NodeContext<'_>,
  ) -> Result<NodeOutput, NodeFailure> {
    let doc = ctx
      .document
      .ok_or_else(|| NodeFailure::new("no document loaded for this run"))?;
    let content = doc.content.as_str();
    let query = derive_query(content, self.query_words);
    ctx
      .progress
      .info(format!("ingested {} bytes", content.len()));
    let mut output = NodeOutput::new(json!({
      "title": extract_title(content),
      "words": content.split_whitespace().count(),
      "lines": content.lines().count(),
      "chars": content.chars().count(),
      "fingerprint": doc.fingerprint,
      "query": query,
    }));
    if content.trim().is_empty() {
      output = output.with_warning("document is empty");
    }
    Ok(output)
  }
}
