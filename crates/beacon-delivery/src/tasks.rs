// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payloads of the three durable task kinds.

use std::time::Duration;

use beacon_core::{BeaconError, NotificationId, PushMessage, SenderId, TaskId};
use beacon_storage::{StoredTask, Txn};
use serde::{Deserialize, Serialize};

pub const COORDINATE: &str = "coordinate";
pub const SEND_BATCH: &str = "send_batch";
pub const RECONCILE: &str = "reconcile";

/// Kinds whose effects commit in the same transaction as their completion,
/// so an interrupted run can simply be repeated.
pub const REPEATABLE_KINDS: &[&str] = &[COORDINATE, RECONCILE];

/// A unit of deferred work, stored as tagged JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduledTask {
    /// One coordination step.
    Coordinate,
    /// One gateway call for a batch.
    SendBatch(SendBatch),
    /// Timeout check for a batch whose sender may have vanished.
    Reconcile(ReconcileBatch),
}

/// A rendered message paired with the notification it delivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub id: NotificationId,
    pub message: PushMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendBatch {
    pub sender_id: SenderId,
    pub reconcile_task_id: TaskId,
    pub items: Vec<BatchItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileBatch {
    pub sender_id: SenderId,
    pub notification_ids: Vec<NotificationId>,
}

impl ScheduledTask {
    pub fn kind(&self) -> &'static str {
        match self {
            ScheduledTask::Coordinate => COORDINATE,
            ScheduledTask::SendBatch(_) => SEND_BATCH,
            ScheduledTask::Reconcile(_) => RECONCILE,
        }
    }

    /// Decodes a claimed task row.
    pub fn from_stored(task: &StoredTask) -> Result<Self, BeaconError> {
        let decoded: Self =
            serde_json::from_str(&task.payload).map_err(BeaconError::serialization)?;
        if decoded.kind() != task.kind {
            return Err(BeaconError::Internal(format!(
                "task {} is stored as `{}` but its payload is `{}`",
                task.id,
                task.kind,
                decoded.kind()
            )));
        }
        Ok(decoded)
    }

    /// Schedules this task inside `txn`.
    pub fn schedule(&self, txn: &Txn<'_>, delay: Duration) -> Result<TaskId, BeaconError> {
        let payload = serde_json::to_string(self).map_err(BeaconError::serialization)?;
        txn.schedule(delay, self.kind(), &payload)
    }
}
