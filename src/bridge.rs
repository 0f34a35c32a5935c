//! Research bridge: answers [ResearchRequest]s for nodes through cache, rate limiter and retry.
//!
//! Per request:
//! 1. a live cache entry for (provider, normalized query) is returned at once, flagged as a
//!    cache hit, without touching the rate limiter;
//! 2. otherwise a token is awaited (FIFO, bounded by the provider's wait timeout);
//! 3. the provider is called with the query as the caller wrote it, under the provider's
//!    [RetryPolicy];
//! 4. a success is cached with the provider's TTL.
//!
//! Concurrent identical requests are coalesced so only one of them reaches the provider.
//! Every failure is typed ([BridgeError]); callers treat them as non-fatal.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheKey, ResponseCache};
use crate::provider::{ProviderError, ResearchProvider};
use crate::rate_limiter::{RateBudget, RateLimiter};
use crate::retry::{RetryError, RetryPolicy};
use crate::types::{ResearchRequest, ResearchResult};

/// Cache of research results shared between bridges.
pub type ResearchCache = ResponseCache<CacheKey, ResearchResult>;

/// Per-provider policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
  pub ttl: Duration,
  pub retry: RetryPolicy,
  /// How long a request may queue for a rate-limit token.
  pub wait_timeout: Duration,
  pub budget: RateBudget,
}

impl Default for ProviderSettings {
  fn default() -> Self {
    Self {
      ttl: Duration::from_secs(60 * 60),
      retry: RetryPolicy::default(),
      wait_timeout: Duration::from_secs(10),
      budget: RateBudget::default(),
    }
  }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
  #[error("unknown research provider: {0}")]
  UnknownProvider(String),
  #[error("rate limited: no token for provider '{provider}' within {waited:?}")]
  RateLimited { provider: String, waited: Duration },
  #[error("provider '{provider}' unavailable after {attempts} attempts: {last_error}")]
  ProviderUnavailable {
    provider: String,
    attempts: u32,
    last_error: String,
  },
  #[error("provider '{provider}' rejected the request: {reason}")]
  ProviderRejected { provider: String, reason: String },
}

struct RegisteredProvider {
  provider: Arc<dyn ResearchProvider>,
  settings: ProviderSettings,
}

pub struct ResearchBridge {
  providers: HashMap<String, RegisteredProvider>,
  limiter: Arc<RateLimiter>,
  cache: Arc<ResearchCache>,
  in_flight: Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
}

/// Builder for [ResearchBridge].
#[derive(Default)]
pub struct ResearchBridgeBuilder {
  providers: Vec<(Arc<dyn ResearchProvider>, ProviderSettings)>,
  limiter: Option<Arc<RateLimiter>>,
  cache: Option<Arc<ResearchCache>>,
}

impl ResearchBridgeBuilder {
  pub fn provider(mut self, provider: Arc<dyn ResearchProvider>, settings: ProviderSettings) -> Self {
    self.providers.push((provider, settings));
    self
  }

  /// Shares an existing limiter. Without one, a limiter is built from the providers' budgets.
  pub fn limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
    self.limiter = Some(limiter);
    self
  }

  pub fn cache(mut self, cache: Arc<ResearchCache>) -> Self {
    self.cache = Some(cache);
    self
  }

  pub fn build(self) -> ResearchBridge {
    let limiter = self.limiter.unwrap_or_else(|| {
      let limiter = self
        .providers
        .iter()
        .fold(RateLimiter::default(), |l, (p, s)| {
          l.with_budget(p.name(), s.budget)
        });
      Arc::new(limiter)
    });
    let providers = self
      .providers
      .into_iter()
      .map(|(provider, settings)| {
        (
          provider.name().to_string(),
          RegisteredProvider { provider, settings },
        )
      })
      .collect();
    ResearchBridge {
      providers,
      limiter,
      cache: self.cache.unwrap_or_default(),
      in_flight: Mutex::new(HashMap::new()),
    }
  }
}

impl ResearchBridge {
  pub fn builder() -> ResearchBridgeBuilder {
    ResearchBridgeBuilder::default()
  }

  /// Registered provider names, sorted.
  pub fn provider_names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.providers.keys().cloned().collect();
    names.sort();
    names
  }

  pub fn has_provider(&self, name: &str) -> bool {
    self.providers.contains_key(name)
  }

  pub fn cache(&self) -> &Arc<ResearchCache> {
    &self.cache
  }

  pub fn limiter(&self) -> &Arc<RateLimiter> {
    &self.limiter
  }

  fn cached(&self, key: &CacheKey) -> Option<ResearchResult> {
    self.cache.get(key).map(|mut r| {
      r.cache_hit = true;
      r
    })
  }

  fn flight(&self, key: &CacheKey) -> Arc<tokio::sync::Mutex<()>> {
    let mut flights = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
    flights.entry(key.clone()).or_default().clone()
  }

  /// Drops the coalescing lock for `key` once nobody else is waiting on it.
  fn release_flight(&self, key: &CacheKey, flight: &Arc<tokio::sync::Mutex<()>>) {
    let mut flights = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
    let idle = flights
      .get(key)
      .is_some_and(|f| Arc::ptr_eq(f, flight) && Arc::strong_count(flight) <= 2);
    if idle {
      flights.remove(key);
    }
  }

  /// Fetches research for `request`. See the module docs for the algorithm.
  #[instrument(
    level = "debug",
    skip(self, request),
    fields(provider = %request.provider, correlation_id = %request.correlation_id)
  )]
  pub async fn fetch(&self, request: &ResearchRequest) -> Result<ResearchResult, BridgeError> {
    let registered = self
      .providers
      .get(&request.provider)
      .ok_or_else(|| BridgeError::UnknownProvider(request.provider.clone()))?;
    let key = CacheKey::new(&request.provider, &request.query);
    if key.query.is_empty() {
      return Err(BridgeError::ProviderRejected {
        provider: key.provider,
        reason: "empty query".to_string(),
      });
    }
    if let Some(hit) = self.cached(&key) {
      debug!(query = %key.query, "research cache hit");
      return Ok(hit);
    }

    let flight = self.flight(&key);
    let result = {
      let _guard = flight.lock().await;
      match self.cached(&key) {
        Some(hit) => Ok(hit),
        None => self.fetch_uncached(registered, &key, &request.query).await,
      }
    };
    self.release_flight(&key, &flight);
    result
  }

  async fn fetch_uncached(
    &self,
    registered: &RegisteredProvider,
    key: &CacheKey,
    query: &str,
  ) -> Result<ResearchResult, BridgeError> {
    let settings = &registered.settings;
    self
      .limiter
      .acquire(&key.provider, settings.wait_timeout)
      .await
      .map_err(|e| {
        warn!(provider = %key.provider, "research request rate limited");
        BridgeError::RateLimited {
          provider: e.provider,
          waited: e.timeout,
        }
      })?;

    let provider = registered.provider.clone();
    let hits = settings
      .retry
      .execute(
        |attempt| {
          let provider = provider.clone();
          let query = query.to_string();
          async move {
            debug!(attempt, "calling research provider");
            provider.search(&query).await
          }
        },
        ProviderError::is_transient,
      )
      .await
      .map_err(|e| match e {
        RetryError::Terminal { error, .. } => BridgeError::ProviderRejected {
          provider: key.provider.clone(),
          reason: error.to_string(),
        },
        RetryError::Exhausted { attempts, error } => BridgeError::ProviderUnavailable {
          provider: key.provider.clone(),
          attempts,
          last_error: error.to_string(),
        },
      })?;

    let result = ResearchResult {
      provider: key.provider.clone(),
      query: key.query.clone(),
      hits,
      cache_hit: false,
      fetched_at: Utc::now(),
    };
    self.cache.insert(key.clone(), result.clone(), settings.ttl);
    info!(provider = %key.provider, hits = result.hits.len(), "research fetched");
    Ok(result)
  }
}
