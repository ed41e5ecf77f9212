//! Store manager that dispatches to the configured provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use papermill_core::config::cache::CacheConfig;
use papermill_core::error::AppError;
use papermill_core::result::AppResult;
use papermill_core::traits::cache::CacheProvider;

/// Store manager that wraps the configured cache provider.
///
/// The provider is selected at construction time based on configuration.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// The inner cache provider.
    inner: Arc<dyn CacheProvider>,
}

impl CacheManager {
    /// Create a new store manager from configuration.
    pub async fn new(config: &CacheConfig) -> AppResult<Self> {
        let inner: Arc<dyn CacheProvider> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis store provider");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                let provider =
                    crate::redis::RedisCacheProvider::new(client, config.default_ttl_seconds);
                Arc::new(provider)
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory store provider");
                let provider = crate::memory::MemoryCacheProvider::new(
                    &config.memory,
                    config.default_ttl_seconds,
                );
                Arc::new(provider)
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown cache provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a store manager from an existing provider (for testing).
    pub fn from_provider(provider: Arc<dyn CacheProvider>) -> Self {
        Self { inner: provider }
    }

    /// Get a reference to the inner provider.
    pub fn provider(&self) -> &dyn CacheProvider {
        self.inner.as_ref()
    }
}

#[async_trait]
impl CacheProvider for CacheManager {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn set_default(&self, key: &str, value: &str) -> AppResult<()> {
        self.inner.set_default(key, value).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.inner.exists(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        self.inner.expire(key, ttl).await
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> AppResult<()> {
        self.inner.hash_set(key, field, value).await
    }

    async fn hash_set_nx(&self, key: &str, field: &str, value: &str) -> AppResult<bool> {
        self.inner.hash_set_nx(key, field, value).await
    }

    async fn hash_incr_by(&self, key: &str, field: &str, by: i64) -> AppResult<i64> {
        self.inner.hash_incr_by(key, field, by).await
    }

    async fn hash_get_all(&self, key: &str) -> AppResult<Option<HashMap<String, String>>> {
        self.inner.hash_get_all(key).await
    }

    async fn list_push_front(&self, key: &str, value: &str) -> AppResult<u64> {
        self.inner.list_push_front(key, value).await
    }

    async fn list_trim(&self, key: &str, start: i64, stop: i64) -> AppResult<()> {
        self.inner.list_trim(key, start, stop).await
    }

    async fn list_range(&self, key: &str, start: i64, stop: i64) -> AppResult<Vec<String>> {
        self.inner.list_range(key, start, stop).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }

    async fn flush_all(&self) -> AppResult<()> {
        self.inner.flush_all().await
    }
}
