//! Tenant configuration.

use serde::{Deserialize, Serialize};

/// A single tenant definition.
///
/// Immutable after process start; loaded once into the
/// [`TenantRegistry`](crate::tenants::TenantRegistry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Unique tenant identifier.
    pub id: String,
    /// Human-readable tenant name.
    pub display_name: String,
    /// Maximum parallel render jobs for this tenant.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Requests per minute. Carried as configuration only; the
    /// orchestration layer does not enforce it.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,
    /// Emails per minute. Configuration only, not enforced.
    #[serde(default = "default_email_rate_limit")]
    pub email_rate_limit_per_minute: u32,
}

/// The `tenants` configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantsConfig {
    /// All configured tenants.
    #[serde(default)]
    pub entries: Vec<TenantConfig>,
    /// Tenant id used when a request does not specify one and as the
    /// fallback entry for lookups of unconfigured tenants.
    #[serde(default)]
    pub default_tenant: Option<String>,
}

fn default_concurrency() -> usize {
    5
}

fn default_rate_limit() -> u32 {
    100
}

fn default_email_rate_limit() -> u32 {
    50
}
