//! TTL response cache.
//!
//! An entry is logically absent once `now > created_at + ttl`. Expired entries are dropped when
//! read; [ResponseCache::purge_expired] (or the sweeper from [ResponseCache::spawn_sweeper])
//! removes the rest proactively.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::types::normalize_query;

/// Cache key for research results: provider plus normalized query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  pub provider: String,
  pub query: String,
}

impl CacheKey {
  pub fn new(provider: &str, query: &str) -> Self {
    Self {
      provider: provider.to_string(),
      query: normalize_query(query),
    }
  }
}

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
  pub value: V,
  pub created_at: Instant,
  pub ttl: Duration,
}

impl<V> CacheEntry<V> {
  pub fn is_expired_at(&self, now: Instant) -> bool {
    now.saturating_duration_since(self.created_at) > self.ttl
  }
}

pub struct ResponseCache<K, V> {
  entries: RwLock<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> Default for ResponseCache<K, V> {
  fn default() -> Self {
    Self {
      entries: RwLock::new(HashMap::new()),
    }
  }
}

impl<K, V> ResponseCache<K, V>
where
  K: Eq + Hash + Clone + std::fmt::Debug,
  V: Clone,
{
  pub fn new() -> Self {
    Self::default()
  }

  /// Live value for `key`; an expired entry is evicted and reported as a miss.
  #[instrument(level = "trace", skip(self))]
  pub fn get(&self, key: &K) -> Option<V> {
    let now = Instant::now();
    {
      let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
      match entries.get(key) {
        None => return None,
        Some(entry) if !entry.is_expired_at(now) => return Some(entry.value.clone()),
        Some(_) => {}
      }
    }
    let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
    if entries.get(key).is_some_and(|e| e.is_expired_at(now)) {
      entries.remove(key);
      debug!(?key, "evicted expired cache entry");
    }
    None
  }

  pub fn insert(&self, key: K, value: V, ttl: Duration) {
    let entry = CacheEntry {
      value,
      created_at: Instant::now(),
      ttl,
    };
    self
      .entries
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(key, entry);
  }

  pub fn invalidate(&self, key: &K) -> bool {
    self
      .entries
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(key)
      .is_some()
  }

  /// Removes every expired entry; returns how many were dropped.
  pub fn purge_expired(&self) -> usize {
    let now = Instant::now();
    let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
    let before = entries.len();
    entries.retain(|_, e| !e.is_expired_at(now));
    before - entries.len()
  }

  /// Number of stored entries, including expired ones not yet evicted.
  pub fn len(&self) -> usize {
    self
      .entries
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl<K, V> ResponseCache<K, V>
where
  K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
  V: Clone + Send + Sync + 'static,
{
  /// Background task purging expired entries every `every`. Stops when the cache is dropped.
  pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
    let weak = Arc::downgrade(self);
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(every);
      ticker.tick().await;
      loop {
        ticker.tick().await;
        let Some(cache) = weak.upgrade() else {
          break;
        };
        let purged = cache.purge_expired();
        if purged > 0 {
          debug!(purged, "cache sweep");
        }
      }
    })
  }
}
