//! Per-provider token buckets gating outbound research requests.
//!
//! Refill is computed lazily from elapsed time on each consumption attempt; no background
//! timer runs. Every provider has its own bucket and lock, so providers never contend.
//! [RateLimiter::acquire] queues callers FIFO (tokio's mutex is fair) until a token frees up
//! or their timeout elapses.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// Stand-in deadline for effectively unbounded waits.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Token budget of one provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateBudget {
  pub capacity: u32,
  pub refill_per_second: f64,
}

impl Default for RateBudget {
  fn default() -> Self {
    Self {
      capacity: 5,
      refill_per_second: 1.0,
    }
  }
}

/// Token bucket. `tokens` always stays within `[0, capacity]`.
#[derive(Debug)]
pub struct TokenBucket {
  budget: RateBudget,
  tokens: f64,
  last_refill: Instant,
}

impl TokenBucket {
  /// A full bucket.
  pub fn new(budget: RateBudget) -> Self {
    Self::starting_at(budget, Instant::now())
  }

  pub fn starting_at(budget: RateBudget, now: Instant) -> Self {
    Self {
      budget,
      tokens: f64::from(budget.capacity),
      last_refill: now,
    }
  }

  fn refill(&mut self, now: Instant) {
    let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
    let rate = self.budget.refill_per_second.max(0.0);
    self.tokens = (self.tokens + elapsed * rate).min(f64::from(self.budget.capacity));
    if now > self.last_refill {
      self.last_refill = now;
    }
  }

  /// Consumes one token, or returns how long until one will be available
  /// (`Duration::MAX` if never).
  pub fn try_consume_at(&mut self, now: Instant) -> Result<(), Duration> {
    self.refill(now);
    if self.tokens >= 1.0 {
      self.tokens -= 1.0;
      Ok(())
    } else {
      Err(self.time_until_token())
    }
  }

  fn time_until_token(&self) -> Duration {
    let rate = self.budget.refill_per_second;
    if self.budget.capacity == 0 || rate <= 0.0 {
      return Duration::MAX;
    }
    Duration::try_from_secs_f64((1.0 - self.tokens) / rate).unwrap_or(Duration::MAX)
  }

  /// Tokens available at `now` (refilled).
  pub fn available_at(&mut self, now: Instant) -> f64 {
    self.refill(now);
    self.tokens
  }

  pub fn budget(&self) -> RateBudget {
    self.budget
  }
}

/// No token became available for `provider` within the caller's timeout.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("rate limited: no token for provider '{provider}' within {timeout:?}")]
pub struct RateLimitTimeout {
  pub provider: String,
  pub timeout: Duration,
}

struct ProviderBucket {
  bucket: Mutex<TokenBucket>,
  /// Held by the waiter at the head of the queue.
  queue: tokio::sync::Mutex<()>,
}

impl ProviderBucket {
  fn consume(&self, now: Instant) -> Result<(), Duration> {
    self
      .bucket
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .try_consume_at(now)
  }
}

/// Token buckets keyed by provider name.
pub struct RateLimiter {
  default_budget: RateBudget,
  budgets: HashMap<String, RateBudget>,
  buckets: RwLock<HashMap<String, Arc<ProviderBucket>>>,
}

impl RateLimiter {
  /// Limiter where every provider uses `default_budget` unless configured otherwise.
  pub fn new(default_budget: RateBudget) -> Self {
    Self {
      default_budget,
      budgets: HashMap::new(),
      buckets: RwLock::new(HashMap::new()),
    }
  }

  pub fn with_budget(mut self, provider: impl Into<String>, budget: RateBudget) -> Self {
    self.budgets.insert(provider.into(), budget);
    self
  }

  pub fn budget_for(&self, provider: &str) -> RateBudget {
    self
      .budgets
      .get(provider)
      .copied()
      .unwrap_or(self.default_budget)
  }

  fn bucket(&self, provider: &str) -> Arc<ProviderBucket> {
    if let Some(b) = self
      .buckets
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(provider)
    {
      return b.clone();
    }
    let budget = self.budget_for(provider);
    self
      .buckets
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .entry(provider.to_string())
      .or_insert_with(|| {
        Arc::new(ProviderBucket {
          bucket: Mutex::new(TokenBucket::new(budget)),
          queue: tokio::sync::Mutex::new(()),
        })
      })
      .clone()
  }

  /// Consumes a token for `provider` if one is available right now. Does not queue.
  #[instrument(level = "trace", skip(self))]
  pub fn try_consume(&self, provider: &str) -> bool {
    self.bucket(provider).consume(Instant::now()).is_ok()
  }

  /// Waits in FIFO order for a token for `provider`, giving up after `timeout`.
  #[instrument(level = "trace", skip(self))]
  pub async fn acquire(&self, provider: &str, timeout: Duration) -> Result<(), RateLimitTimeout> {
    let timed_out = || RateLimitTimeout {
      provider: provider.to_string(),
      timeout,
    };
    let bucket = self.bucket(provider);
    let now = Instant::now();
    let deadline = now.checked_add(timeout).unwrap_or(now + FAR_FUTURE);
    let _turn = tokio::time::timeout_at(deadline, bucket.queue.lock())
      .await
      .map_err(|_| timed_out())?;
    loop {
      let wait = match bucket.consume(Instant::now()) {
        Ok(()) => return Ok(()),
        Err(wait) => wait,
      };
      if wait > deadline.saturating_duration_since(Instant::now()) {
        debug!(provider, ?wait, "token would arrive after deadline");
        return Err(timed_out());
      }
      tokio::time::sleep(wait).await;
    }
  }

  /// Tokens currently available for `provider`.
  pub fn available(&self, provider: &str) -> f64 {
    self
      .bucket(provider)
      .bucket
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .available_at(Instant::now())
  }
}

impl Default for RateLimiter {
  fn default() -> Self {
    Self::new(RateBudget::default())
  }
}
