// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the Expo push API.

use beacon_core::PushTicket;
use serde::Deserialize;

/// Successful `push/send` response body.
#[derive(Debug, Deserialize)]
pub struct SendResponse {
    /// Tickets in request order.
    pub data: Vec<PushTicket>,
}
