//! Research bridge request/response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A node's request for research from one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchRequest {
  pub provider: String,
  pub query: String,
  /// Session the request is made on behalf of; used for log correlation.
  pub correlation_id: String,
}

impl ResearchRequest {
  pub fn new(
    provider: impl Into<String>,
    query: impl Into<String>,
    correlation_id: impl Into<String>,
  ) -> Self {
    Self {
      provider: provider.into(),
      query: query.into(),
      correlation_id: correlation_id.into(),
    }
  }
}

/// One normalized hit returned by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchHit {
  pub title: String,
  #[serde(default)]
  pub url: Option<String>,
  #[serde(default)]
  pub snippet: Option<String>,
  #[serde(default)]
  pub score: Option<f64>,
}

impl ResearchHit {
  pub fn titled(title: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      url: None,
      snippet: None,
      score: None,
    }
  }
}

/// Answer to a [ResearchRequest]. Values are immutable once produced; cached copies are
/// handed out with `cache_hit` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
  pub provider: String,
  /// Normalized form of the query that produced these hits.
  pub query: String,
  pub hits: Vec<ResearchHit>,
  pub cache_hit: bool,
  pub fetched_at: DateTime<Utc>,
}

/// Normalizes a query for cache keying: trimmed, lower-cased, inner whitespace collapsed.
pub fn normalize_query(query: &str) -> String {
  query
    .split_whitespace()
    .map(str::to_lowercase)
    .collect::<Vec<_>>()
    .join(" ")
}
