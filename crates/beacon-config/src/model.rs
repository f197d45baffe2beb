// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Beacon push delivery service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Beacon configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BeaconConfig {
    /// Batching, concurrency and retry limits of the delivery coordinator.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Push gateway endpoint settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Durable task runner settings.
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Delivery coordinator limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Maximum notifications per gateway request.
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,

    /// Maximum number of senders with a live task at any time.
    #[serde(default = "default_max_concurrent_senders")]
    pub max_concurrent_senders: usize,

    /// Failed attempts after which a notification is abandoned.
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,

    /// Delay between `ensure_coordinator` and the coordination step, in ms.
    /// Concurrent triggers inside this window collapse into one step.
    #[serde(default = "default_coordinator_delay_ms")]
    pub coordinator_delay_ms: u64,

    /// Horizon after which an unreported batch is reconciled, in ms.
    #[serde(default = "default_sender_timeout_ms")]
    pub sender_timeout_ms: u64,
}

impl DeliveryConfig {
    pub fn coordinator_delay(&self) -> Duration {
        Duration::from_millis(self.coordinator_delay_ms)
    }

    pub fn sender_timeout(&self) -> Duration {
        Duration::from_millis(self.sender_timeout_ms)
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_batch: default_max_batch(),
            max_concurrent_senders: default_max_concurrent_senders(),
            max_retry_attempts: default_max_retry_attempts(),
            coordinator_delay_ms: default_coordinator_delay_ms(),
            sender_timeout_ms: default_sender_timeout_ms(),
        }
    }
}

fn default_max_batch() -> usize {
    100
}

fn default_max_concurrent_senders() -> usize {
    10
}

fn default_max_retry_attempts() -> u32 {
    5
}

fn default_coordinator_delay_ms() -> u64 {
    250
}

fn default_sender_timeout_ms() -> u64 {
    10_000
}

/// Push gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Endpoint receiving the batched JSON array.
    #[serde(default = "default_gateway_url")]
    pub url: String,

    /// Expo enhanced-security access token. `None` sends unauthenticated requests.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Whole-request timeout in seconds. Must end before
    /// `delivery.sender_timeout_ms` so a hung request is retried rather than
    /// reconciled.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            access_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_gateway_url() -> String {
    "https://exp.host/--/api/v2/push/send".to_string()
}

fn default_request_timeout_secs() -> u64 {
    8
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("beacon").join("beacon.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "beacon.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Durable task runner configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// Upper bound on how long the runner sleeps before re-checking for due
    /// tasks. Tasks scheduled by other processes are picked up within this.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long `serve` waits for running handlers after a shutdown signal.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,

    /// Finished task rows older than this are purged.
    #[serde(default = "default_task_retention_secs")]
    pub task_retention_secs: u64,
}

impl RunnerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }

    pub fn task_retention(&self) -> Duration {
        Duration::from_secs(self.task_retention_secs)
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            drain_timeout_secs: default_drain_timeout_secs(),
            task_retention_secs: default_task_retention_secs(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_drain_timeout_secs() -> u64 {
    30
}

fn default_task_retention_secs() -> u64 {
    24 * 60 * 60
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
