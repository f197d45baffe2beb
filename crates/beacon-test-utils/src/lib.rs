// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Beacon integration tests.
//!
//! Provides a scripted push gateway and a harness wiring it to a temp
//! database, a delivery service and a task runner, for deterministic tests
//! without network access.
//!
//! # Components
//!
//! - [`MockGateway`] - Push gateway replaying scripted replies and recording requests
//! - [`TestHarness`] - Complete delivery stack over a temp SQLite database

pub mod harness;
pub mod mock_gateway;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_gateway::{MockGateway, MockReply};
