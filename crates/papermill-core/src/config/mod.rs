//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod cache;
pub mod logging;
pub mod mailer;
pub mod notifier;
pub mod queue;
pub mod renderer;
pub mod server;
pub mod tenant;

use serde::{Deserialize, Serialize};

use self::cache::CacheConfig;
use self::logging::LoggingConfig;
use self::mailer::MailerConfig;
use self::notifier::NotifierConfig;
use self::queue::QueueConfig;
use self::renderer::RendererConfig;
use self::server::ServerConfig;
use self::tenant::TenantsConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Cache / shared-store provider settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Job queue settings (attempts, backoff, notification concurrency).
    #[serde(default)]
    pub queue: QueueConfig,
    /// Rendering engine settings.
    #[serde(default)]
    pub renderer: RendererConfig,
    /// Mail transport settings.
    #[serde(default)]
    pub mailer: MailerConfig,
    /// Owner-notification callback settings.
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// Tenant definitions.
    #[serde(default)]
    pub tenants: TenantsConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `PAPERMILL__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PAPERMILL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            cache: CacheConfig::default(),
            queue: QueueConfig::default(),
            renderer: RendererConfig::default(),
            mailer: MailerConfig::default(),
            notifier: NotifierConfig::default(),
            tenants: TenantsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
