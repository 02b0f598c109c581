//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for a pooled client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend addresses (e.g., "127.0.0.1:9090").
    pub addresses: Vec<String>,

    /// Per-address pool and breaker settings.
    pub pool: PoolOptions,

    /// Connection establishment settings.
    pub connect: ConnectConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Options applied to every address of a group.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct PoolOptions {
    /// Resources created per address at startup.
    pub init_num: usize,

    /// Maximum resources kept idle per address.
    pub max_cap: usize,

    /// Idle resources older than this are closed instead of handed out.
    pub idle_timeout_ms: u64,

    /// Base breaker cooldown step.
    pub time_to_open_unit_ms: u64,

    /// Breaker cooldown ceiling.
    pub time_to_open_max_ms: u64,
}

impl PoolOptions {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn time_to_open_unit(&self) -> Duration {
        Duration::from_millis(self.time_to_open_unit_ms)
    }

    pub fn time_to_open_max(&self) -> Duration {
        Duration::from_millis(self.time_to_open_max_ms)
    }
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            init_num: 2,
            max_cap: 16,
            idle_timeout_ms: 60_000,
            time_to_open_unit_ms: 1_000,
            time_to_open_max_ms: 30_000,
        }
    }
}

/// Connection establishment settings for the TCP resource.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectConfig {
    /// Connect timeout in milliseconds.
    pub timeout_ms: u64,
}

impl ConnectConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self { timeout_ms: 3_000 }
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

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
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
            metrics_address: "127.0.0.1:9100".to_string(),
        }
    }
}
