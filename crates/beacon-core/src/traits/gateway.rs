// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push gateway trait for delivery backends (Expo, mocks).

use async_trait::async_trait;

use crate::error::BeaconError;
use crate::types::{GatewayResponse, PushMessage};

/// A push gateway accepting one batched request per delivery attempt.
///
/// Implementations must distinguish the three outcomes the sender relies on:
/// - `Err(_)`: the call could not complete (DNS, connect, timeout before any
///   response). Nothing was delivered, so the batch is safe to retry.
/// - `Ok(GatewayResponse::Rejected { .. })`: a response arrived but it was not
///   a success. The request may have been partially processed.
/// - `Ok(GatewayResponse::Accepted(tickets))`: per-item results, positionally
///   aligned with `messages`.
#[async_trait]
pub trait PushGateway: Send + Sync + 'static {
    /// Returns the human-readable name of this gateway.
    fn name(&self) -> &str;

    /// Sends every message in one request.
    async fn send(&self, messages: &[PushMessage]) -> Result<GatewayResponse, BeaconError>;
}
