//! Owner-notification callback configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Failure-notification callback configuration.
///
/// Callbacks are best-effort: delivery failures are logged and swallowed,
/// never surfaced to job processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Default callback URL when a tenant has no dedicated entry.
    #[serde(default)]
    pub default_callback_url: Option<String>,
    /// Per-tenant callback URLs, keyed by tenant id.
    #[serde(default)]
    pub tenant_callback_urls: HashMap<String, String>,
    /// Callback timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            default_callback_url: None,
            tenant_callback_urls: HashMap::new(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl NotifierConfig {
    /// Resolve the callback URL for a tenant, falling back to the default.
    pub fn callback_url(&self, tenant_id: &str) -> Option<&str> {
        self.tenant_callback_urls
            .get(tenant_id)
            .or(self.default_callback_url.as_ref())
            .map(String::as_str)
    }
}

fn default_timeout() -> u64 {
    5
}
