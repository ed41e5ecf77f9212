//! Mail transport configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Mail transport configuration.
///
/// A `default` transport serves tenants without a dedicated entry;
/// per-tenant transports override it, mirroring tenant-specific SMTP
/// settings in upstream deployments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailerConfig {
    /// Default transport used when a tenant has no dedicated entry.
    #[serde(default)]
    pub default: Option<TransportConfig>,
    /// Per-tenant transport overrides, keyed by tenant id.
    #[serde(default)]
    pub tenants: HashMap<String, TransportConfig>,
}

/// A single outbound mail gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Mail gateway endpoint URL.
    pub gateway_url: String,
    /// Sender address.
    #[serde(default = "default_from")]
    pub from: String,
    /// Optional bearer token for the gateway.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Send timeout in seconds.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_seconds: u64,
}

fn default_from() -> String {
    "noreply@papermill.local".to_string()
}

fn default_send_timeout() -> u64 {
    30
}
