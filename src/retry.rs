//! Bounded retry with exponential backoff and jitter.
//!
//! Attempt 1 runs immediately; attempt `k > 1` first waits
//! `base_delay * 2^(k-2) + jitter`, capped at `max_delay`. A caller-supplied predicate decides
//! which failures are transient; anything else stops the loop at once.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub base_delay: Duration,
  /// Upper bound of the uniform random jitter added to each delay.
  pub max_jitter: Duration,
  /// Cap on the exponential part of the delay.
  pub max_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      base_delay: Duration::from_millis(500),
      max_jitter: Duration::from_millis(250),
      max_delay: Duration::from_secs(30),
    }
  }
}

/// Why [RetryPolicy::execute] gave up.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetryError<E> {
  /// A failure classified as non-transient; no further attempts were made.
  #[error("terminal failure on attempt {attempt}: {error}")]
  Terminal { attempt: u32, error: E },
  /// Every attempt failed transiently; `error` is the last one.
  #[error("gave up after {attempts} attempts: {error}")]
  Exhausted { attempts: u32, error: E },
}

impl<E> RetryError<E> {
  pub fn into_inner(self) -> E {
    match self {
      RetryError::Terminal { error, .. } | RetryError::Exhausted { error, .. } => error,
    }
  }

  pub fn attempts(&self) -> u32 {
    match self {
      RetryError::Terminal { attempt, .. } => *attempt,
      RetryError::Exhausted { attempts, .. } => *attempts,
    }
  }
}

impl RetryPolicy {
  pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
    Self {
      max_attempts,
      base_delay,
      ..Self::default()
    }
  }

  pub fn with_jitter(mut self, max_jitter: Duration) -> Self {
    self.max_jitter = max_jitter;
    self
  }

  pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
    self.max_delay = max_delay;
    self
  }

  /// Backoff before `attempt` (1-based), without jitter. Zero for the first attempt.
  pub fn backoff(&self, attempt: u32) -> Duration {
    if attempt <= 1 {
      return Duration::ZERO;
    }
    let factor = 2u32.saturating_pow(attempt - 2);
    self.base_delay.saturating_mul(factor).min(self.max_delay)
  }

  fn jitter(&self) -> Duration {
    if self.max_jitter.is_zero() {
      return Duration::ZERO;
    }
    let max = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(rand::thread_rng().gen_range(0..=max))
  }

  /// Runs `op` until it succeeds, fails terminally, or `max_attempts` is reached.
  /// `op` receives the 1-based attempt number.
  #[instrument(level = "trace", skip(self, op, is_transient))]
  pub async fn execute<T, E, F, Fut, P>(&self, mut op: F, is_transient: P) -> Result<T, RetryError<E>>
  where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
  {
    let max_attempts = self.max_attempts.max(1);
    let mut attempt = 1;
    loop {
      if attempt > 1 {
        let delay = self.backoff(attempt) + self.jitter();
        debug!(attempt, ?delay, "backing off before retry");
        tokio::time::sleep(delay).await;
      }
      match op(attempt).await {
        Ok(value) => return Ok(value),
        Err(error) if !is_transient(&error) => {
          debug!(attempt, %error, "terminal failure; not retrying");
          return Err(RetryError::Terminal { attempt, error });
        }
        Err(error) if attempt >= max_attempts => {
          warn!(attempts = attempt, %error, "retries exhausted");
          return Err(RetryError::Exhausted {
            attempts: attempt,
            error,
          });
        }
        Err(error) => {
          debug!(attempt, %error, "transient failure");
          attempt += 1;
        }
      }
    }
  }
}
