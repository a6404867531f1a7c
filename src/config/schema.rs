//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the monitor.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the self-heal daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Tick scheduling and state persistence.
    pub watcher: WatcherConfig,

    /// Health probe target.
    pub probe: ProbeConfig,

    /// Model providers failover alternates between.
    pub models: ModelsConfig,

    /// Shell commands run as recovery hooks.
    pub hooks: HooksConfig,

    /// Health report server.
    pub server: ServerConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Watcher scheduling configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WatcherConfig {
    /// Enable the periodic tick loop.
    pub enabled: bool,

    /// Where the health state record is persisted.
    pub state_path: PathBuf,

    /// Tick period in milliseconds.
    pub interval_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            state_path: PathBuf::from("data/health_state.json"),
            interval_ms: 30_000,
        }
    }
}

impl WatcherConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Scheme and host of the probed service (e.g., "http://127.0.0.1").
    pub base_url: String,

    /// Port of the probed service.
    pub port: u16,

    /// Path of the health endpoint.
    pub path: String,

    /// Probe timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1".to_string(),
            port: 3000,
            path: "/health".to_string(),
            timeout_ms: 5_000,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Model failover configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ModelsConfig {
    /// Model selected on a fresh state.
    pub primary: String,

    /// Model switched to when the primary fails.
    pub fallback: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            primary: "openrouter".to_string(),
            fallback: "gemini".to_string(),
        }
    }
}

/// Recovery hook commands. Each is run through `sh -c`; unset means no-op.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct HooksConfig {
    pub graceful_restart: Option<String>,
    pub hard_restart: Option<String>,
    pub clear_caches: Option<String>,
}

/// Health report server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8787").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8787".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: MonitorConfig = toml::from_str("").unwrap();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config: MonitorConfig = toml::from_str(
            r#"
            [probe]
            port = 8080
            timeout_ms = 250

            [models]
            fallback = "ollama"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.probe.port, 8080);
        assert_eq!(config.probe.path, "/health");
        assert_eq!(config.probe.timeout(), Duration::from_millis(250));
        assert_eq!(config.models.primary, "openrouter");
        assert_eq!(config.models.fallback, "ollama");
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert!(config.hooks.hard_restart.is_none());
    }
}
