//! Per-tenant transport resolution.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use papermill_core::config::mailer::MailerConfig;

use crate::transport::{DisabledTransport, HttpMailTransport, MailTransport, VerifyResult};

/// Resolves the mail transport for a tenant, falling back to the default
/// transport when the tenant has no dedicated entry.
#[derive(Debug, Clone)]
pub struct MailerRegistry {
    default: Arc<dyn MailTransport>,
    tenants: HashMap<String, Arc<dyn MailTransport>>,
}

impl MailerRegistry {
    /// Build transports from configuration.
    pub fn from_config(config: &MailerConfig) -> Self {
        let default: Arc<dyn MailTransport> = match &config.default {
            Some(transport) => {
                info!("Default mail transport initialized");
                Arc::new(HttpMailTransport::new(transport))
            }
            None => {
                warn!("No default mail transport configured; mail sending disabled");
                Arc::new(DisabledTransport)
            }
        };

        let tenants = config
            .tenants
            .iter()
            .map(|(tenant_id, transport)| {
                info!(tenant_id = %tenant_id, "Tenant mail transport initialized");
                (
                    tenant_id.clone(),
                    Arc::new(HttpMailTransport::new(transport)) as Arc<dyn MailTransport>,
                )
            })
            .collect();

        Self { default, tenants }
    }

    /// Registry with explicit transports (for testing).
    pub fn with_transports(
        default: Arc<dyn MailTransport>,
        tenants: HashMap<String, Arc<dyn MailTransport>>,
    ) -> Self {
        Self { default, tenants }
    }

    /// The transport for a tenant.
    pub fn transport(&self, tenant_id: &str) -> Arc<dyn MailTransport> {
        self.tenants
            .get(tenant_id)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.default))
    }

    /// Verify a tenant's transport.
    pub async fn verify(&self, tenant_id: &str) -> VerifyResult {
        self.transport(tenant_id).verify().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use papermill_core::result::AppResult;

    use crate::transport::MailMessage;

    #[derive(Debug)]
    struct NamedTransport(&'static str);

    #[async_trait]
    impl MailTransport for NamedTransport {
        async fn send(&self, _message: &MailMessage) -> AppResult<String> {
            Ok(self.0.to_string())
        }

        async fn verify(&self) -> VerifyResult {
            VerifyResult {
                success: true,
                message: self.0.to_string(),
            }
        }
    }

    #[tokio::test]
    async fn test_tenant_override_and_fallback() {
        let mut tenants: HashMap<String, Arc<dyn MailTransport>> = HashMap::new();
        tenants.insert("t1".to_string(), Arc::new(NamedTransport("tenant")));
        let registry = MailerRegistry::with_transports(Arc::new(NamedTransport("default")), tenants);

        assert_eq!(registry.verify("t1").await.message, "tenant");
        assert_eq!(registry.verify("other").await.message, "default");
    }

    #[tokio::test]
    async fn test_disabled_transport_fails_send() {
        let registry =
            MailerRegistry::with_transports(Arc::new(DisabledTransport), HashMap::new());
        let message = MailMessage {
            to: "a@b.c".to_string(),
            subject: "s".to_string(),
            html_body: "<p>x</p>".to_string(),
            attachment: None,
        };
        assert!(registry.transport("t1").send(&message).await.is_err());
    }
}
