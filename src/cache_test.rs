//! Tests for `ResponseCache`.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheKey, ResponseCache};

#[test]
fn cache_key_normalizes_query() {
  assert_eq!(
    CacheKey::new("arxiv", "  Graph   NEURAL nets "),
    CacheKey::new("arxiv", "graph neural nets")
  );
  assert_ne!(CacheKey::new("arxiv", "q"), CacheKey::new("pubmed", "q"));
}

#[tokio::test(start_paused = true)]
async fn hit_before_ttl_miss_after() {
  let cache: ResponseCache<CacheKey, String> = ResponseCache::new();
  let key = CacheKey::new("p", "q");
  cache.insert(key.clone(), "v".to_string(), Duration::from_secs(10));
  tokio::time::advance(Duration::from_secs(9)).await;
  assert_eq!(cache.get(&key).as_deref(), Some("v"));
  tokio::time::advance(Duration::from_secs(2)).await;
  assert_eq!(cache.get(&key), None);
  assert!(cache.is_empty(), "expired entry evicted on read");
}

#[tokio::test(start_paused = true)]
async fn entry_at_exact_ttl_is_still_live() {
  let cache: ResponseCache<&'static str, u32> = ResponseCache::new();
  cache.insert("k", 1, Duration::from_secs(5));
  tokio::time::advance(Duration::from_secs(5)).await;
  assert_eq!(cache.get(&"k"), Some(1));
}

#[tokio::test(start_paused = true)]
async fn purge_expired_drops_only_dead_entries() {
  let cache: ResponseCache<&'static str, u32> = ResponseCache::new();
  cache.insert("short", 1, Duration::from_secs(1));
  cache.insert("long", 2, Duration::from_secs(100));
  tokio::time::advance(Duration::from_secs(2)).await;
  assert_eq!(cache.len(), 2);
  assert_eq!(cache.purge_expired(), 1);
  assert_eq!(cache.len(), 1);
  assert_eq!(cache.get(&"long"), Some(2));
}

#[tokio::test(start_paused = true)]
async fn sweeper_purges_in_background() {
  let cache: Arc<ResponseCache<&'static str, u32>> = Arc::new(ResponseCache::new());
  cache.insert("k", 1, Duration::from_secs(1));
  let sweeper = cache.spawn_sweeper(Duration::from_secs(5));
  tokio::time::sleep(Duration::from_secs(6)).await;
  assert!(cache.is_empty());
  drop(cache);
  tokio::time::sleep(Duration::from_secs(6)).await;
  assert!(sweeper.is_finished());
}

#[test]
fn invalidate_removes_entry() {
  let cache: ResponseCache<&'static str, u32> = ResponseCache::new();
  cache.insert("k", 1, Duration::from_secs(60));
  assert!(cache.invalidate(&"k"));
  assert!(!cache.invalidate(&"k"));
  assert_eq!(cache.get(&"k"), None);
}
