// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed operations on [`crate::Txn`], one module per table.

pub mod config;
pub mod coordinators;
pub mod notifications;
pub mod senders;
pub mod tasks;
pub mod tokens;
