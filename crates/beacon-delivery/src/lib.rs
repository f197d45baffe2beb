// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push delivery pipeline for Beacon.
//!
//! A singleton coordinator batches queued notifications and hands each batch
//! to a sender task, which makes one gateway call and reports per-message
//! outcomes. A reconciler task paired with every batch resolves notifications
//! whose sender vanished. All state changes commit through
//! [`beacon_storage::Database::transact`]; deferred work runs on the
//! [`TaskRunner`].

pub mod coordinator;
pub mod lifecycle;
pub mod reconciler;
pub mod runner;
pub mod sender;
pub mod service;
pub mod settings;
pub mod tasks;

pub use coordinator::{CoordinationOutcome, EnsureOutcome};
pub use lifecycle::DrainReport;
pub use runner::TaskRunner;
pub use sender::{AttemptOutcome, BatchReport};
pub use service::DeliveryService;
pub use settings::DeliverySettings;
pub use tasks::ScheduledTask;
