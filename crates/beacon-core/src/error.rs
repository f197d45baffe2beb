// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Beacon push delivery service.

use thiserror::Error;

/// The primary error type shared by every Beacon crate.
///
/// Ambiguous delivery outcomes and exhausted retries are *not* errors: they
/// are recorded as notification states and surfaced through status queries.
#[derive(Debug, Error)]
pub enum BeaconError {
    /// Configuration errors (invalid TOML, out-of-range values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A persisted payload could not be encoded or decoded.
    #[error("serialization error: {source}")]
    Serialization {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The push gateway could not be reached, or the call did not complete.
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The user has no registered push token.
    #[error("no push token found for user {user_id}")]
    NoPushToken { user_id: String },

    /// The notification payload was rejected before it was queued.
    #[error("invalid notification: {0}")]
    InvalidNotification(String),

    /// A coordination invariant was violated. Indicates a logic defect.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BeaconError {
    /// Wraps any error as a [`BeaconError::Storage`].
    pub fn storage<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BeaconError::Storage {
            source: Box::new(e),
        }
    }

    /// Wraps a serde error as a [`BeaconError::Serialization`].
    pub fn serialization(e: serde_json::Error) -> Self {
        BeaconError::Serialization {
            source: Box::new(e),
        }
    }

    /// Returns true for errors caused by the caller's input. These are
    /// reported back and never retried.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            BeaconError::NoPushToken { .. } | BeaconError::InvalidNotification(_)
        )
    }
}
