//! Engine configuration sections.
//!
//! Every section carries defaults so a minimal (even empty) file is valid.

use serde::{Deserialize, Serialize};

/// Root configuration of the engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Where the configuration tree is read from.
    pub source: SourceConfig,

    /// Model cache behaviour.
    pub model: ModelConfig,

    /// Diagnostics HTTP API.
    pub server: ServerConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Configuration tree source.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// TOML document describing the tree.
    pub path: String,

    /// Reload the document when it changes on disk.
    pub watch: bool,

    /// Poll interval for the file watcher.
    pub poll_interval_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: "hst.toml".to_string(),
            watch: true,
            poll_interval_secs: 2,
        }
    }
}

/// Model cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Build the model at startup instead of on first request.
    pub eager_build: bool,

    /// Upper bound of changed paths coalesced into one background rebuild.
    pub max_batch_paths: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            eager_build: true,
            max_batch_paths: 10_000,
        }
    }
}

/// Diagnostics HTTP server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    /// Bind address (e.g., "127.0.0.1:8085").
    pub bind_address: String,

    /// Per-request timeout.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8085".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter (trace, debug, info, warn, error or an EnvFilter directive).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9095".to_string(),
        }
    }
}
