// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types owned by the storage layer.

use beacon_core::{TaskId, TaskStatus};

/// A row of the durable scheduler table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTask {
    pub id: TaskId,
    /// Handler discriminator, e.g. `coordinate`.
    pub kind: String,
    /// JSON payload handed to the handler.
    pub payload: String,
    pub state: TaskStatus,
    /// Unix milliseconds at which the task becomes due.
    pub run_at: i64,
    /// Runner instance that claimed the task, if any.
    pub claimed_by: Option<String>,
    pub error: Option<String>,
}

/// Tasks found `in_progress` under a runner that is no longer alive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Returned to `pending` because their effects commit atomically with completion.
    pub requeued: usize,
    /// Marked `failed` because their side effects may already have happened.
    pub failed: usize,
}
