// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Expo push API gateway for Beacon.
//!
//! [`ExpoGateway`] implements [`beacon_core::PushGateway`] over the Expo
//! `push/send` endpoint: one JSON array per batch, one ticket per message.

pub mod client;
pub mod types;

pub use client::ExpoGateway;
