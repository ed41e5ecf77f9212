//! Batch progress tracker.
//!
//! One hash per (tenant, batch) holds the counters and attribution
//! metadata. Counters only ever move through atomic hash increments, so
//! arbitrary interleaving from concurrent workers across the same or
//! different jobs cannot lose updates.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use papermill_cache::keys;
use papermill_core::result::AppResult;
use papermill_core::traits::cache::CacheProvider;

/// Attribution metadata attached to a batch at start time and forwarded
/// to the owner callback on failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchMeta {
    /// Owning user in the caller's system.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Owning application in the caller's system.
    #[serde(default)]
    pub app_id: Option<String>,
    /// Caller-supplied batch label.
    #[serde(default)]
    pub unique_name: Option<String>,
}

/// Aggregate progress snapshot for one batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatus {
    /// Owning tenant.
    pub tenant_id: String,
    /// Caller-supplied batch identifier.
    pub batch_id: String,
    /// Expected job count as supplied at start.
    pub total: i64,
    /// Jobs that reached terminal success.
    pub completed: i64,
    /// Jobs that reached terminal failure.
    pub failed: i64,
    /// `max(0, total - completed - failed)`, clamped against races
    /// between start and increments.
    pub pending: i64,
}

/// TTL applied to every batch hash.
const BATCH_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Tracks batch progress in the shared store.
#[derive(Debug, Clone)]
pub struct BatchTracker {
    store: Arc<dyn CacheProvider>,
}

impl BatchTracker {
    /// Create a tracker over the given store.
    pub fn new(store: Arc<dyn CacheProvider>) -> Self {
        Self { store }
    }

    /// Initialize or update a batch.
    ///
    /// Idempotent with respect to re-starts: `total` and metadata are
    /// always set to the latest values, but `completed`/`failed` are only
    /// initialized when absent, so a duplicate start call never erases
    /// live progress.
    pub async fn start_batch(
        &self,
        tenant_id: &str,
        batch_id: &str,
        total: i64,
        meta: &BatchMeta,
    ) -> AppResult<()> {
        let key = keys::batch(tenant_id, batch_id);

        self.store.hash_set(&key, "total", &total.to_string()).await?;
        self.store.hash_set_nx(&key, "completed", "0").await?;
        self.store.hash_set_nx(&key, "failed", "0").await?;
        self.store
            .hash_set_nx(&key, "createdAt", &Utc::now().timestamp_millis().to_string())
            .await?;

        if let Some(user_id) = &meta.user_id {
            self.store.hash_set(&key, "userId", user_id).await?;
        }
        if let Some(app_id) = &meta.app_id {
            self.store.hash_set(&key, "appId", app_id).await?;
        }
        if let Some(unique_name) = &meta.unique_name {
            self.store.hash_set(&key, "uniqueName", unique_name).await?;
        }

        self.store.expire(&key, BATCH_TTL).await?;

        debug!(tenant_id, batch_id, total, "Batch started");
        Ok(())
    }

    /// Record one terminal job success.
    pub async fn incr_completed(&self, tenant_id: &str, batch_id: &str) -> AppResult<()> {
        let key = keys::batch(tenant_id, batch_id);
        self.store.hash_incr_by(&key, "completed", 1).await?;
        Ok(())
    }

    /// Record one terminal job failure.
    pub async fn incr_failed(&self, tenant_id: &str, batch_id: &str) -> AppResult<()> {
        let key = keys::batch(tenant_id, batch_id);
        self.store.hash_incr_by(&key, "failed", 1).await?;
        Ok(())
    }

    /// Read the progress snapshot, or `None` for a batch that was never
    /// started.
    pub async fn status(&self, tenant_id: &str, batch_id: &str) -> AppResult<Option<BatchStatus>> {
        let key = keys::batch(tenant_id, batch_id);
        let Some(fields) = self.store.hash_get_all(&key).await? else {
            return Ok(None);
        };

        let total = field_i64(&fields, "total");
        let completed = field_i64(&fields, "completed");
        let failed = field_i64(&fields, "failed");

        Ok(Some(BatchStatus {
            tenant_id: tenant_id.to_string(),
            batch_id: batch_id.to_string(),
            total,
            completed,
            failed,
            pending: (total - completed - failed).max(0),
        }))
    }

    /// Read the attribution metadata, or `None` for an unknown batch.
    pub async fn meta(&self, tenant_id: &str, batch_id: &str) -> AppResult<Option<BatchMeta>> {
        let key = keys::batch(tenant_id, batch_id);
        let Some(fields) = self.store.hash_get_all(&key).await? else {
            return Ok(None);
        };

        Ok(Some(BatchMeta {
            user_id: fields.get("userId").cloned(),
            app_id: fields.get("appId").cloned(),
            unique_name: fields.get("uniqueName").cloned(),
        }))
    }
}

fn field_i64(fields: &HashMap<String, String>, name: &str) -> i64 {
    fields
        .get(name)
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0)
}
