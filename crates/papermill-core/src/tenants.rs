//! Static tenant registry.
//!
//! Tenants are an isolated configuration domain: each carries its own
//! concurrency cap and rate-limit figures and owns a dedicated queue set.
//! The registry is built once at startup and never mutated.

use std::collections::HashMap;

use crate::config::tenant::{TenantConfig, TenantsConfig};
use crate::error::AppError;
use crate::result::AppResult;

/// Immutable tenant lookup built from configuration.
#[derive(Debug, Clone)]
pub struct TenantRegistry {
    /// Tenant configs keyed by id.
    tenants: HashMap<String, TenantConfig>,
    /// Fallback tenant id, when configured.
    default_tenant: Option<String>,
}

impl TenantRegistry {
    /// Build the registry from the `tenants` configuration section.
    pub fn from_config(config: &TenantsConfig) -> Self {
        let tenants = config
            .entries
            .iter()
            .map(|t| (t.id.clone(), t.clone()))
            .collect();
        Self {
            tenants,
            default_tenant: config.default_tenant.clone(),
        }
    }

    /// Look up a tenant, falling back to the default entry when no
    /// tenant-specific entry exists.
    pub fn get(&self, tenant_id: &str) -> Option<&TenantConfig> {
        self.tenants.get(tenant_id).or_else(|| {
            self.default_tenant
                .as_deref()
                .and_then(|id| self.tenants.get(id))
        })
    }

    /// Look up a tenant where the operation strictly requires one.
    ///
    /// Fails with a `Queue`-kind error when neither a tenant-specific nor
    /// a default entry exists (e.g. queue provisioning).
    pub fn require(&self, tenant_id: &str) -> AppResult<&TenantConfig> {
        self.get(tenant_id)
            .ok_or_else(|| AppError::queue(format!("Unknown tenant: '{tenant_id}'")))
    }

    /// The configured default tenant id, if any.
    pub fn default_tenant(&self) -> Option<&str> {
        self.default_tenant.as_deref()
    }

    /// Iterate over all configured tenants.
    pub fn iter(&self) -> impl Iterator<Item = &TenantConfig> {
        self.tenants.values()
    }

    /// Number of configured tenants.
    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    /// Whether no tenants are configured.
    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_registry() -> TenantRegistry {
        TenantRegistry::from_config(&TenantsConfig {
            entries: vec![
                TenantConfig {
                    id: "t1".to_string(),
                    display_name: "Tenant One".to_string(),
                    concurrency: 5,
                    rate_limit_per_minute: 100,
                    email_rate_limit_per_minute: 50,
                },
                TenantConfig {
                    id: "default".to_string(),
                    display_name: "Default".to_string(),
                    concurrency: 3,
                    rate_limit_per_minute: 50,
                    email_rate_limit_per_minute: 25,
                },
            ],
            default_tenant: Some("default".to_string()),
        })
    }

    #[test]
    fn test_get_specific() {
        let registry = make_registry();
        assert_eq!(registry.get("t1").unwrap().concurrency, 5);
    }

    #[test]
    fn test_falls_back_to_default() {
        let registry = make_registry();
        assert_eq!(registry.get("nope").unwrap().id, "default");
    }

    #[test]
    fn test_require_without_default() {
        let registry = TenantRegistry::from_config(&TenantsConfig::default());
        let err = registry.require("nope").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Queue);
    }
}
