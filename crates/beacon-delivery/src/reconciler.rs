// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timeout check for batches whose sender never reported.
//!
//! A sender that crashed or hung may or may not have reached the gateway, so
//! its notifications are resolved to `maybe_delivered` and never retried.

use beacon_core::{BeaconError, NotificationState, TaskId};
use beacon_storage::{Database, Txn};
use tracing::warn;

use crate::coordinator::ensure_coordinator;
use crate::settings::DeliverySettings;
use crate::tasks::ReconcileBatch;

/// Resolves the batch's still-owned notifications, then re-ensures the
/// coordinator. Returns how many notifications were resolved.
pub fn reconcile_batch(
    txn: &Txn<'_>,
    settings: &DeliverySettings,
    batch: &ReconcileBatch,
) -> Result<usize, BeaconError> {
    let mut resolved = 0;
    for id in &batch.notification_ids {
        if txn.settle_notification(id, &batch.sender_id, NotificationState::MaybeDelivered)? {
            resolved += 1;
        }
    }
    ensure_coordinator(txn, settings)?;
    Ok(resolved)
}

/// Runs a reconcile task in one transaction, completing the task with it.
pub async fn reconcile(
    db: &Database,
    settings: DeliverySettings,
    task_id: TaskId,
    batch: ReconcileBatch,
) -> Result<usize, BeaconError> {
    let sender_id = batch.sender_id.clone();
    let batch_len = batch.notification_ids.len();
    let resolved = db
        .transact(move |txn| {
            txn.complete_task(&task_id)?;
            reconcile_batch(txn, &settings, &batch)
        })
        .await?;
    warn!(
        sender = %sender_id,
        resolved,
        batch = batch_len,
        "sender did not report in time, notifications marked maybe delivered"
    );
    Ok(resolved)
}
