//! Cache provider trait for pluggable shared-store backends.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// Trait for shared-store backends (Redis or in-memory).
///
/// Plain values are serialized as strings (JSON). Hashes back the batch
/// progress counters and lists back the bounded error log, so both the
/// hash-increment and the push/trim operations must be atomic under
/// arbitrary interleaving from concurrent workers; increments are never
/// implemented as read-then-write.
#[async_trait]
pub trait CacheProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Get a value by key. Returns `None` if the key does not exist or has expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a value with a TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Set a value with the default TTL.
    async fn set_default(&self, key: &str, value: &str) -> AppResult<()>;

    /// Delete a key.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check whether a key exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Set the TTL on an existing key.
    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool>;

    /// Set a hash field to a value.
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> AppResult<()>;

    /// Set a hash field only if it does not already exist.
    /// Returns `true` when the field was set.
    async fn hash_set_nx(&self, key: &str, field: &str, value: &str) -> AppResult<bool>;

    /// Atomically increment an integer hash field. Returns the new value.
    async fn hash_incr_by(&self, key: &str, field: &str, by: i64) -> AppResult<i64>;

    /// Read all fields of a hash. Returns `None` when the key is missing
    /// or empty, never a zero-valued map.
    async fn hash_get_all(&self, key: &str) -> AppResult<Option<HashMap<String, String>>>;

    /// Push a value to the front of a list. Returns the new list length.
    async fn list_push_front(&self, key: &str, value: &str) -> AppResult<u64>;

    /// Trim a list to the inclusive index range `[start, stop]`,
    /// front-first.
    async fn list_trim(&self, key: &str, start: i64, stop: i64) -> AppResult<()>;

    /// Read the inclusive index range `[start, stop]` of a list,
    /// front-first.
    async fn list_range(&self, key: &str, start: i64, stop: i64) -> AppResult<Vec<String>>;

    /// Get a typed value by deserializing from JSON.
    async fn get_json<T: serde::de::DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> AppResult<Option<T>>
    where
        Self: Sized,
    {
        match self.get(key).await? {
            Some(value) => {
                let parsed = serde_json::from_str(&value)?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    /// Set a typed value by serializing to JSON.
    async fn set_json<T: serde::Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> AppResult<()>
    where
        Self: Sized,
    {
        let json = serde_json::to_string(value)?;
        self.set(key, &json, ttl).await
    }

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Flush all entries.
    async fn flush_all(&self) -> AppResult<()>;
}
