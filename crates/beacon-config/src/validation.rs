// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as positive limits and a usable gateway URL.

use crate::diagnostic::ConfigError;
use crate::model::BeaconConfig;

/// The gateway rejects requests carrying more messages than this.
pub const GATEWAY_BATCH_LIMIT: usize = 100;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &BeaconConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let delivery = &config.delivery;
    if delivery.max_batch == 0 || delivery.max_batch > GATEWAY_BATCH_LIMIT {
        fail(format!(
            "delivery.max_batch must be between 1 and {GATEWAY_BATCH_LIMIT}, got {}",
            delivery.max_batch
        ));
    }
    if delivery.max_concurrent_senders == 0 {
        fail("delivery.max_concurrent_senders must be at least 1".to_string());
    }
    if delivery.max_retry_attempts == 0 {
        fail("delivery.max_retry_attempts must be at least 1".to_string());
    }
    if delivery.sender_timeout_ms == 0 {
        fail("delivery.sender_timeout_ms must be greater than 0".to_string());
    }

    let url = config.gateway.url.trim();
    if url.is_empty() {
        fail("gateway.url must not be empty".to_string());
    } else if !(url.starts_with("http://") || url.starts_with("https://")) {
        fail(format!("gateway.url `{url}` must use an http or https scheme"));
    }
    if config.gateway.request_timeout_secs == 0 {
        fail("gateway.request_timeout_secs must be at least 1".to_string());
    } else if delivery.sender_timeout_ms > 0
        && config.gateway.request_timeout_secs.saturating_mul(1000) >= delivery.sender_timeout_ms
    {
        fail(format!(
            "gateway.request_timeout_secs ({}s) must be shorter than delivery.sender_timeout_ms ({}ms)",
            config.gateway.request_timeout_secs, delivery.sender_timeout_ms
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.runner.poll_interval_ms == 0 {
        fail("runner.poll_interval_ms must be at least 1".to_string());
    }

    if !LOG_LEVELS.contains(&config.log.level.as_str()) {
        fail(format!(
            "log.level `{}` must be one of {}",
            config.log.level,
            LOG_LEVELS.join(", ")
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
