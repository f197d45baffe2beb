// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Beacon push delivery service.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-writer concurrency model via `tokio-rusqlite`. The durable task
//! scheduler lives in the same database, so records and the tasks that refer
//! to them are written in one transaction.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod txn;

pub use database::Database;
pub use models::{RecoveryReport, StoredTask};
pub use txn::Txn;
