//! In-memory store implementation using the moka and dashmap crates.
//!
//! Plain key-value entries live in a moka cache; hashes and lists live in
//! dashmap maps whose per-entry shard locks give the same atomicity the
//! Redis backend gets from HINCRBY and LPUSH/LTRIM. Intended for tests
//! and single-node development; counters do not survive a restart.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use papermill_core::config::cache::MemoryCacheConfig;
use papermill_core::result::AppResult;
use papermill_core::traits::cache::CacheProvider;

/// In-memory store provider.
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    /// Plain key-value entries.
    cache: Cache<String, String>,
    /// Hash entries (batch counters).
    hashes: Arc<dashmap::DashMap<String, HashMap<String, String>>>,
    /// List entries (error logs), front-first.
    lists: Arc<dashmap::DashMap<String, VecDeque<String>>>,
    /// Default TTL for plain entries.
    default_ttl: Duration,
}

impl MemoryCacheProvider {
    /// Create a new in-memory store from configuration.
    pub fn new(config: &MemoryCacheConfig, default_ttl_seconds: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.time_to_live_seconds))
            .build();

        Self {
            cache,
            hashes: Arc::new(dashmap::DashMap::new()),
            lists: Arc::new(dashmap::DashMap::new()),
            default_ttl: Duration::from_secs(default_ttl_seconds),
        }
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.cache.get(key).await)
    }

    async fn set(&self, key: &str, value: &str, _ttl: Duration) -> AppResult<()> {
        // moka applies TTL at cache level, not per entry.
        self.cache.insert(key.to_string(), value.to_string()).await;
        Ok(())
    }

    async fn set_default(&self, key: &str, value: &str) -> AppResult<()> {
        self.set(key, value, self.default_ttl).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.cache.remove(key).await;
        self.hashes.remove(key);
        self.lists.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.cache.contains_key(key)
            || self.hashes.contains_key(key)
            || self.lists.contains_key(key))
    }

    async fn expire(&self, key: &str, _ttl: Duration) -> AppResult<bool> {
        // Per-entry TTL is not supported in-memory; report whether the
        // key exists so callers see Redis-compatible semantics.
        self.exists(key).await
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> AppResult<()> {
        self.hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hash_set_nx(&self, key: &str, field: &str, value: &str) -> AppResult<bool> {
        let mut hash = self.hashes.entry(key.to_string()).or_default();
        if hash.contains_key(field) {
            return Ok(false);
        }
        hash.insert(field.to_string(), value.to_string());
        Ok(true)
    }

    async fn hash_incr_by(&self, key: &str, field: &str, by: i64) -> AppResult<i64> {
        // The dashmap entry guard holds the shard lock for the whole
        // read-update, so concurrent increments never interleave.
        let mut hash = self.hashes.entry(key.to_string()).or_default();
        let current = hash
            .get(field)
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);
        let next = current + by;
        hash.insert(field.to_string(), next.to_string());
        Ok(next)
    }

    async fn hash_get_all(&self, key: &str) -> AppResult<Option<HashMap<String, String>>> {
        Ok(self
            .hashes
            .get(key)
            .filter(|h| !h.is_empty())
            .map(|h| h.clone()))
    }

    async fn list_push_front(&self, key: &str, value: &str) -> AppResult<u64> {
        let mut list = self.lists.entry(key.to_string()).or_default();
        list.push_front(value.to_string());
        Ok(list.len() as u64)
    }

    async fn list_trim(&self, key: &str, start: i64, stop: i64) -> AppResult<()> {
        if let Some(mut list) = self.lists.get_mut(key) {
            let len = list.len() as i64;
            let start = start.clamp(0, len);
            let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
            if stop < start {
                list.clear();
            } else {
                let kept: VecDeque<String> = list
                    .iter()
                    .skip(start as usize)
                    .take((stop - start + 1) as usize)
                    .cloned()
                    .collect();
                *list = kept;
            }
        }
        Ok(())
    }

    async fn list_range(&self, key: &str, start: i64, stop: i64) -> AppResult<Vec<String>> {
        let Some(list) = self.lists.get(key) else {
            return Ok(Vec::new());
        };
        let len = list.len() as i64;
        let start = start.clamp(0, len);
        let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
        if stop < start {
            return Ok(Vec::new());
        }
        Ok(list
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn flush_all(&self) -> AppResult<()> {
        self.cache.invalidate_all();
        self.hashes.clear();
        self.lists.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_provider() -> MemoryCacheProvider {
        let config = MemoryCacheConfig {
            max_capacity: 1000,
            time_to_live_seconds: 60,
        };
        MemoryCacheProvider::new(&config, 60)
    }

    #[tokio::test]
    async fn test_set_get() {
        let provider = make_provider();
        provider
            .set("key1", "value1", Duration::from_secs(60))
            .await
            .unwrap();
        let val = provider.get("key1").await.unwrap();
        assert_eq!(val, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_hash_incr() {
        let provider = make_provider();
        assert_eq!(provider.hash_incr_by("h", "completed", 1).await.unwrap(), 1);
        assert_eq!(provider.hash_incr_by("h", "completed", 1).await.unwrap(), 2);
        assert_eq!(provider.hash_incr_by("h", "failed", 1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_hash_incr_concurrent() {
        let provider = Arc::new(make_provider());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let p = Arc::clone(&provider);
            handles.push(tokio::spawn(async move {
                p.hash_incr_by("batch", "completed", 1).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let all = provider.hash_get_all("batch").await.unwrap().unwrap();
        assert_eq!(all["completed"], "50");
    }

    #[tokio::test]
    async fn test_hash_set_nx() {
        let provider = make_provider();
        assert!(provider.hash_set_nx("h", "total", "3").await.unwrap());
        assert!(!provider.hash_set_nx("h", "total", "9").await.unwrap());
        let all = provider.hash_get_all("h").await.unwrap().unwrap();
        assert_eq!(all["total"], "3");
    }

    #[tokio::test]
    async fn test_hash_get_all_missing_is_none() {
        let provider = make_provider();
        assert!(provider.hash_get_all("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_push_and_trim() {
        let provider = make_provider();
        for i in 0..5 {
            provider
                .list_push_front("log", &format!("e{i}"))
                .await
                .unwrap();
        }
        provider.list_trim("log", 0, 2).await.unwrap();
        let entries = provider.list_range("log", 0, -1).await.unwrap();
        assert_eq!(entries, vec!["e4", "e3", "e2"]);
    }

    #[tokio::test]
    async fn test_flush_all() {
        let provider = make_provider();
        provider.hash_set("h", "f", "v").await.unwrap();
        provider.list_push_front("l", "v").await.unwrap();
        provider.flush_all().await.unwrap();
        assert!(!provider.exists("h").await.unwrap());
        assert!(!provider.exists("l").await.unwrap());
    }
}
