//! Research providers: the port the bridge calls, and an HTTP/JSON implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::types::ResearchHit;

/// Failure of a single provider call, classified for retry decisions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
  #[error("request timed out")]
  Timeout,
  #[error("network error: {0}")]
  Network(String),
  #[error("server error: HTTP {0}")]
  Server(u16),
  #[error("provider signalled rate limiting (retry after {retry_after:?})")]
  RateLimited { retry_after: Option<Duration> },
  #[error("invalid query: {0}")]
  InvalidQuery(String),
  #[error("authentication failed: {0}")]
  Unauthorized(String),
  #[error("malformed response: {0}")]
  Malformed(String),
}

impl ProviderError {
  /// Timeouts, network errors, 5xx and provider rate-limit signals are worth retrying.
  pub fn is_transient(&self) -> bool {
    matches!(
      self,
      ProviderError::Timeout
        | ProviderError::Network(_)
        | ProviderError::Server(_)
        | ProviderError::RateLimited { .. }
    )
  }
}

/// An external research data source.
#[async_trait]
pub trait ResearchProvider: Send + Sync {
  fn name(&self) -> &str;

  /// Runs `query` (already normalized) and returns the provider's hits.
  async fn search(&self, query: &str) -> Result<Vec<ResearchHit>, ProviderError>;
}

/// Accepted response bodies: `{"results": [...]}` or a bare array of hits.
#[derive(Deserialize)]
#[serde(untagged)]
enum SearchBody {
  Wrapped { results: Vec<ResearchHit> },
  Bare(Vec<ResearchHit>),
}

impl SearchBody {
  fn into_hits(self) -> Vec<ResearchHit> {
    match self {
      SearchBody::Wrapped { results } => results,
      SearchBody::Bare(hits) => hits,
    }
  }
}

/// Provider reached over HTTP: `GET <endpoint>?q=<query>&limit=<max_results>` returning JSON.
pub struct HttpResearchProvider {
  name: String,
  endpoint: String,
  max_results: u32,
  client: reqwest::Client,
}

impl HttpResearchProvider {
  pub fn new(
    name: impl Into<String>,
    endpoint: impl Into<String>,
    request_timeout: Duration,
    max_results: u32,
  ) -> Result<Self, reqwest::Error> {
    let client = reqwest::Client::builder().timeout(request_timeout).build()?;
    Ok(Self {
      name: name.into(),
      endpoint: endpoint.into(),
      max_results,
      client,
    })
  }

  fn url(&self, query: &str) -> Result<String, ProviderError> {
    let limit = self.max_results.to_string();
    let params = serde_urlencoded::to_string([("q", query), ("limit", limit.as_str())])
      .map_err(|e| ProviderError::InvalidQuery(e.to_string()))?;
    let sep = if self.endpoint.contains('?') { '&' } else { '?' };
    Ok(format!("{}{}{}", self.endpoint, sep, params))
  }
}

fn classify_transport(e: reqwest::Error) -> ProviderError {
  if e.is_timeout() {
    ProviderError::Timeout
  } else if e.is_decode() {
    ProviderError::Malformed(e.to_string())
  } else {
    ProviderError::Network(e.to_string())
  }
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
  headers
    .get(reqwest::header::RETRY_AFTER)?
    .to_str()
    .ok()?
    .trim()
    .parse::<u64>()
    .ok()
    .map(Duration::from_secs)
}

#[async_trait]
impl ResearchProvider for HttpResearchProvider {
  fn name(&self) -> &str {
    &self.name
  }

  #[instrument(level = "trace", skip(self), fields(provider = %self.name))]
  async fn search(&self, query: &str) -> Result<Vec<ResearchHit>, ProviderError> {
    let url = self.url(query)?;
    let resp = self
      .client
      .get(&url)
      .send()
      .await
      .map_err(classify_transport)?;
    let status = resp.status();
    debug!(status = status.as_u16(), "provider responded");
    if status.is_success() {
      let body: SearchBody = resp.json().await.map_err(|e| {
        if e.is_timeout() {
          ProviderError::Timeout
        } else {
          ProviderError::Malformed(e.to_string())
        }
      })?;
      let mut hits = body.into_hits();
      hits.truncate(self.max_results as usize);
      return Ok(hits);
    }
    Err(match status.as_u16() {
      429 => ProviderError::RateLimited {
        retry_after: retry_after(resp.headers()),
      },
      401 | 403 => ProviderError::Unauthorized(status.to_string()),
      code if status.is_server_error() => ProviderError::Server(code),
      _ => ProviderError::InvalidQuery(status.to_string()),
    })
  }
}
