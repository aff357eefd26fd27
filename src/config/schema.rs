//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the realtime config service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Which remote store / transport implementation to use.
    pub backend: BackendKind,

    /// Redis connection settings.
    pub redis: RedisConfig,

    /// Read-through cache settings.
    pub cache: CacheConfig,

    /// Invalidation channel settings.
    pub pubsub: PubSubConfig,

    /// Change log storage.
    pub audit: AuditConfig,

    /// Admin HTTP API settings.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Config key definitions with their default values.
    pub definitions: BTreeMap<String, Definition>,
}

/// Remote store and broadcast transport implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Redis key-value store plus Redis pub/sub.
    #[default]
    Redis,
    /// Process-local store and channel (single-process mode).
    Memory,
}

/// Redis connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Connection URL (e.g., "redis://127.0.0.1:6379/0").
    pub url: String,

    /// Number of multiplexed connections in the pool.
    pub pool_size: usize,

    /// Deadline for connecting and for each command, in milliseconds.
    pub timeout_ms: u64,

    /// Prefix prepended to every config key in Redis.
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".to_string(),
            pool_size: 4,
            timeout_ms: 500,
            key_prefix: "config:".to_string(),
        }
    }
}

impl RedisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Read-through cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cooldown after a remote failure before the store is tried again.
    pub retry_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: 5_000,
        }
    }
}

impl CacheConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

/// Invalidation channel settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PubSubConfig {
    /// Channel carrying changed key names. Unset or empty disables publish and subscribe.
    pub channel: Option<String>,

    /// Delay before reconnecting after a connection error.
    pub reconnect_delay_ms: u64,

    /// Delay before reconnecting after an unexpected error.
    pub error_delay_ms: u64,
}

impl Default for PubSubConfig {
    fn default() -> Self {
        Self {
            channel: Some("config_updates".to_string()),
            reconnect_delay_ms: 5_000,
            error_delay_ms: 30_000,
        }
    }
}

impl PubSubConfig {
    /// The configured channel, if publish/subscribe is enabled.
    pub fn channel_name(&self) -> Option<&str> {
        self.channel.as_deref().filter(|c| !c.is_empty())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn error_delay(&self) -> Duration {
        Duration::from_millis(self.error_delay_ms)
    }
}

/// Change log storage.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuditConfig {
    /// JSON-lines file for change records. Unset keeps records in memory.
    pub path: Option<PathBuf>,
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin HTTP API.
    pub enabled: bool,

    /// Bind address (e.g., "127.0.0.1:8081").
    pub bind_address: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Config key holding how many change log entries to return.
    pub change_log_limit_key: String,

    /// Bearer token required for write endpoints. Unset leaves them open.
    pub api_key: Option<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8081".to_string(),
            request_timeout_secs: 10,
            change_log_limit_key: "ITEMS_PER_PAGE".to_string(),
            api_key: None,
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
    /// Default log filter, overridden by `RUST_LOG`.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Metrics listener address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "realtime_config=info,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// One config key definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Definition {
    /// Value served when the remote store cannot provide one.
    pub default: serde_json::Value,

    /// Human readable description.
    #[serde(default)]
    pub description: Option<String>,
}
