// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime limits of the delivery state machine.

use std::time::Duration;

use beacon_config::model::DeliveryConfig;

/// Limits applied by the coordinator and sender, resolved from `[delivery]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliverySettings {
    pub max_batch: usize,
    pub max_concurrent_senders: usize,
    pub max_retry_attempts: u32,
    pub coordinator_delay: Duration,
    pub sender_timeout: Duration,
}

impl From<&DeliveryConfig> for DeliverySettings {
    fn from(config: &DeliveryConfig) -> Self {
        Self {
            max_batch: config.max_batch,
            max_concurrent_senders: config.max_concurrent_senders,
            max_retry_attempts: config.max_retry_attempts,
            coordinator_delay: config.coordinator_delay(),
            sender_timeout: config.sender_timeout(),
        }
    }
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self::from(&DeliveryConfig::default())
    }
}
