//! Rendering engine configuration.

use serde::{Deserialize, Serialize};

/// Rendering engine pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Base URL of the renderer sidecar service.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Engine launch timeout in seconds.
    #[serde(default = "default_launch_timeout")]
    pub launch_timeout_seconds: u64,
    /// Per-job content settle timeout in seconds.
    #[serde(default = "default_settle_timeout")]
    pub settle_timeout_seconds: u64,
    /// Interval in seconds between engine health probes.
    #[serde(default = "default_health_interval")]
    pub health_interval_seconds: u64,
    /// Page layout options applied to every rendered document.
    #[serde(default)]
    pub page: PageOptions,
    /// Directory where rendered artifacts are written.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            launch_timeout_seconds: default_launch_timeout(),
            settle_timeout_seconds: default_settle_timeout(),
            health_interval_seconds: default_health_interval(),
            page: PageOptions::default(),
            artifact_dir: default_artifact_dir(),
        }
    }
}

/// Page format and margins for the finished document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageOptions {
    /// Paper format (e.g. `"A4"`).
    #[serde(default = "default_format")]
    pub format: String,
    /// Whether to print backgrounds.
    #[serde(default = "default_true")]
    pub print_background: bool,
    /// Top margin.
    #[serde(default = "default_margin_vertical")]
    pub margin_top: String,
    /// Right margin.
    #[serde(default = "default_margin_horizontal")]
    pub margin_right: String,
    /// Bottom margin.
    #[serde(default = "default_margin_vertical")]
    pub margin_bottom: String,
    /// Left margin.
    #[serde(default = "default_margin_horizontal")]
    pub margin_left: String,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            format: default_format(),
            print_background: default_true(),
            margin_top: default_margin_vertical(),
            margin_right: default_margin_horizontal(),
            margin_bottom: default_margin_vertical(),
            margin_left: default_margin_horizontal(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:9222".to_string()
}

fn default_launch_timeout() -> u64 {
    120
}

fn default_settle_timeout() -> u64 {
    30
}

fn default_health_interval() -> u64 {
    10
}

fn default_artifact_dir() -> String {
    "data/artifacts".to_string()
}

fn default_format() -> String {
    "A4".to_string()
}

fn default_true() -> bool {
    true
}

fn default_margin_vertical() -> String {
    "20mm".to_string()
}

fn default_margin_horizontal() -> String {
    "15mm".to_string()
}
