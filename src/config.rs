//! Orchestrator configuration: state directory, rate budgets and research providers.
//!
//! Loaded from a JSON file. Every field is optional; missing provider settings fall back to
//! [ProviderSettings::default] and `default_budget`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::bridge::{ProviderSettings, ResearchBridge};
use crate::error::OrchestratorError;
use crate::provider::HttpResearchProvider;
use crate::rate_limiter::{RateBudget, RateLimiter};
use crate::retry::RetryPolicy;

/// Default directory for session state, relative to the working directory.
pub const DEFAULT_STATE_DIR: &str = ".analysis";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_MAX_RESULTS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
  pub state_dir: PathBuf,
  /// Budget for providers that do not set their own.
  pub default_budget: RateBudget,
  /// Interval of the cache sweeper in seconds; 0 disables it (expired entries are still
  /// dropped lazily on read).
  pub cache_sweep_secs: u64,
  pub providers: Vec<ProviderConfig>,
}

impl Default for OrchestratorConfig {
  fn default() -> Self {
    Self {
      state_dir: PathBuf::from(DEFAULT_STATE_DIR),
      default_budget: RateBudget::default(),
      cache_sweep_secs: 60,
      providers: Vec::new(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
  pub name: String,
  /// Base URL of an HTTP search endpoint.
  pub endpoint: Option<String>,
  pub capacity: Option<u32>,
  pub refill_per_second: Option<f64>,
  pub cache_ttl_secs: Option<u64>,
  pub max_attempts: Option<u32>,
  pub base_delay_ms: Option<u64>,
  pub max_jitter_ms: Option<u64>,
  pub wait_timeout_ms: Option<u64>,
  pub request_timeout_ms: Option<u64>,
  pub max_results: Option<u32>,
}

impl ProviderConfig {
  pub fn named(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Self::default()
    }
  }

  pub fn budget(&self, default_budget: RateBudget) -> RateBudget {
    RateBudget {
      capacity: self.capacity.unwrap_or(default_budget.capacity),
      refill_per_second: self
        .refill_per_second
        .unwrap_or(default_budget.refill_per_second),
    }
  }

  /// Bridge settings with defaults filled in.
  pub fn settings(&self, default_budget: RateBudget) -> ProviderSettings {
    let defaults = ProviderSettings::default();
    let retry = RetryPolicy {
      max_attempts: self.max_attempts.unwrap_or(defaults.retry.max_attempts),
      base_delay: self
        .base_delay_ms
        .map(Duration::from_millis)
        .unwrap_or(defaults.retry.base_delay),
      max_jitter: self
        .max_jitter_ms
        .map(Duration::from_millis)
        .unwrap_or(defaults.retry.max_jitter),
      max_delay: defaults.retry.max_delay,
    };
    ProviderSettings {
      ttl: self
        .cache_ttl_secs
        .map(Duration::from_secs)
        .unwrap_or(defaults.ttl),
      retry,
      wait_timeout: self
        .wait_timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(defaults.wait_timeout),
      budget: self.budget(default_budget),
    }
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_millis(self.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS))
  }
}

fn invalid(msg: impl Into<String>) -> OrchestratorError {
  OrchestratorError::Config(msg.into())
}

impl OrchestratorConfig {
  /// Reads and validates a JSON config file.
  #[instrument(level = "trace")]
  pub fn load(path: &Path) -> Result<Self, OrchestratorError> {
    let text = std::fs::read_to_string(path)
      .map_err(|e| OrchestratorError::io(format!("reading config {}", path.display()), e))?;
    Self::from_json(&text)
  }

  pub fn from_json(text: &str) -> Result<Self, OrchestratorError> {
    let config: Self = serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), OrchestratorError> {
    check_budget("default_budget", self.default_budget)?;
    let mut seen = HashSet::new();
    for p in &self.providers {
      if p.name.trim().is_empty() {
        return Err(invalid("provider with empty name"));
      }
      if !seen.insert(p.name.as_str()) {
        return Err(invalid(format!("duplicate provider '{}'", p.name)));
      }
      check_budget(&p.name, p.budget(self.default_budget))?;
      if p.max_attempts == Some(0) {
        return Err(invalid(format!("provider '{}': max_attempts must be at least 1", p.name)));
      }
    }
    Ok(())
  }

  pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
    self.providers.iter().find(|p| p.name == name)
  }

  /// Builds a bridge with one HTTP provider per configured endpoint, sharing one limiter.
  #[instrument(level = "trace", skip(self))]
  pub fn build_bridge(&self) -> Result<ResearchBridge, OrchestratorError> {
    let mut limiter = RateLimiter::new(self.default_budget);
    let mut builder = ResearchBridge::builder();
    for p in &self.providers {
      let Some(endpoint) = p.endpoint.as_deref() else {
        return Err(invalid(format!("provider '{}' has no endpoint", p.name)));
      };
      let provider = HttpResearchProvider::new(
        p.name.as_str(),
        endpoint,
        p.request_timeout(),
        p.max_results.unwrap_or(DEFAULT_MAX_RESULTS),
      )
      .map_err(|e| invalid(format!("provider '{}': {e}", p.name)))?;
      let settings = p.settings(self.default_budget);
      limiter = limiter.with_budget(p.name.as_str(), settings.budget);
      info!(provider = %p.name, endpoint, "research provider configured");
      builder = builder.provider(Arc::new(provider), settings);
    }
    Ok(builder.limiter(Arc::new(limiter)).build())
  }
}

fn check_budget(owner: &str, budget: RateBudget) -> Result<(), OrchestratorError> {
  if budget.capacity == 0 {
    return Err(invalid(format!("{owner}: capacity must be at least 1")));
  }
  if !budget.refill_per_second.is_finite() || budget.refill_per_second < 0.0 {
    return Err(invalid(format!("{owner}: refill_per_second must be a non-negative number")));
  }
  Ok(())
}
