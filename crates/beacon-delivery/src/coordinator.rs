// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The singleton coordinator: batching, admission and dispatch.
//!
//! At most one coordination step is scheduled at any time. The invariant is
//! kept by scan-and-prune in [`ensure_coordinator`] rather than by a unique
//! constraint, because a record whose task has finished is stale but still
//! present until the next scan.

use beacon_core::{BeaconError, NotificationState, PushMessage, SenderId, ServiceState, TaskId};
use beacon_storage::{Database, Txn};
use tracing::{debug, error, info};

use crate::settings::DeliverySettings;
use crate::tasks::{BatchItem, ReconcileBatch, ScheduledTask, SendBatch};

/// Result of [`ensure_coordinator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// A live coordination step already exists.
    AlreadyScheduled,
    /// The service is shutting down; nothing was scheduled.
    AdmissionClosed,
    /// A new coordination step was scheduled.
    Scheduled(TaskId),
}

/// Guarantees a coordination step is scheduled, unless admission is closed.
///
/// Must run inside the caller's transaction. More than one live coordinator
/// is a logic defect and aborts the transaction.
pub fn ensure_coordinator(
    txn: &Txn<'_>,
    settings: &DeliverySettings,
) -> Result<EnsureOutcome, BeaconError> {
    let mut live = Vec::new();
    for coordinator in txn.list_coordinators()? {
        if txn.task_status(&coordinator.dispatch_task_id)?.is_live() {
            live.push(coordinator);
        } else {
            txn.delete_coordinator(&coordinator.id)?;
        }
    }

    match live.len() {
        0 => {}
        1 => {
            debug!(coordinator = %live[0].id, "coordinator already scheduled");
            return Ok(EnsureOutcome::AlreadyScheduled);
        }
        n => {
            error!(count = n, "more than one live coordinator");
            return Err(BeaconError::Invariant(format!(
                "expected at most one live coordinator, found {n}"
            )));
        }
    }

    if txn.service_state()? == ServiceState::ShuttingDown {
        info!("shutting down, not starting a new coordinator");
        return Ok(EnsureOutcome::AdmissionClosed);
    }

    let task_id = ScheduledTask::Coordinate.schedule(txn, settings.coordinator_delay)?;
    let coordinator_id = txn.insert_coordinator(&task_id)?;
    debug!(coordinator = %coordinator_id, task = %task_id, "scheduled coordinator");
    Ok(EnsureOutcome::Scheduled(task_id))
}

/// Result of one coordination step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinationOutcome {
    /// Nothing was queued.
    Idle,
    /// Admission is closed; queued work waits for a restart.
    Paused,
    /// The sender pool is full; a finishing sender will re-trigger coordination.
    Saturated { live_senders: usize },
    /// A batch was handed to a new sender and/or abandoned at the retry ceiling.
    Dispatched {
        sender_id: Option<SenderId>,
        dispatched: usize,
        abandoned: usize,
    },
}

/// One coordination step: select a batch, apply back-pressure, dispatch.
///
/// Runs as a single transaction, so no notification can be selected by two
/// steps.
pub fn coordinate(
    txn: &Txn<'_>,
    settings: &DeliverySettings,
) -> Result<CoordinationOutcome, BeaconError> {
    if txn.service_state()? == ServiceState::ShuttingDown {
        info!("shutting down, leaving queued notifications for restart");
        return Ok(CoordinationOutcome::Paused);
    }

    let mut batch = txn.oldest_in_state(NotificationState::NeedsRetry, settings.max_batch)?;
    let remaining = settings.max_batch.saturating_sub(batch.len());
    batch.extend(txn.oldest_in_state(NotificationState::AwaitingDelivery, remaining)?);
    if batch.is_empty() {
        debug!("no notifications to send");
        return Ok(CoordinationOutcome::Idle);
    }

    let mut live_senders = 0;
    for sender in txn.list_senders()? {
        let status = txn.task_status(&sender.dispatch_task_id)?;
        if status.is_live() {
            live_senders += 1;
        } else {
            debug!(sender = %sender.id, %status, "pruning finished sender");
            txn.delete_sender(&sender.id)?;
        }
    }
    if live_senders >= settings.max_concurrent_senders {
        info!(
            live_senders,
            queued = batch.len(),
            "sender pool full, waiting for a sender to finish"
        );
        return Ok(CoordinationOutcome::Saturated { live_senders });
    }

    let (exhausted, sendable): (Vec<_>, Vec<_>) = batch
        .into_iter()
        .partition(|n| n.num_previous_failures >= settings.max_retry_attempts);

    for notification in &exhausted {
        txn.mark_unable_to_deliver(&notification.id)?;
    }
    if !exhausted.is_empty() {
        info!(count = exhausted.len(), "abandoned notifications at the retry ceiling");
    }

    if sendable.is_empty() {
        // Everything selected was abandoned; keep draining the queue.
        ensure_coordinator(txn, settings)?;
        return Ok(CoordinationOutcome::Dispatched {
            sender_id: None,
            dispatched: 0,
            abandoned: exhausted.len(),
        });
    }

    let sender_id = SenderId::generate();
    let mut items = Vec::with_capacity(sendable.len());
    for notification in sendable {
        txn.mark_in_progress(&notification.id, &sender_id)?;
        items.push(BatchItem {
            message: PushMessage::render(&notification.token, &notification.metadata),
            id: notification.id,
        });
    }
    let dispatched = items.len();

    let reconcile_task_id = ScheduledTask::Reconcile(ReconcileBatch {
        sender_id: sender_id.clone(),
        notification_ids: items.iter().map(|item| item.id.clone()).collect(),
    })
    .schedule(txn, settings.sender_timeout)?;

    let dispatch_task_id = ScheduledTask::SendBatch(SendBatch {
        sender_id: sender_id.clone(),
        reconcile_task_id: reconcile_task_id.clone(),
        items,
    })
    .schedule(txn, std::time::Duration::ZERO)?;

    txn.insert_sender(&sender_id, &dispatch_task_id, &reconcile_task_id)?;
    debug!(
        sender = %sender_id,
        task = %dispatch_task_id,
        reconcile_task = %reconcile_task_id,
        dispatched,
        "started sender"
    );

    Ok(CoordinationOutcome::Dispatched {
        sender_id: Some(sender_id),
        dispatched,
        abandoned: exhausted.len(),
    })
}

/// Runs a coordinate task, completing the task in the same transaction.
///
/// The task is completed first so that the step's own record is already
/// stale if it needs to re-ensure the coordinator.
pub async fn run_coordination(
    db: &Database,
    settings: DeliverySettings,
    task_id: TaskId,
) -> Result<CoordinationOutcome, BeaconError> {
    db.transact(move |txn| {
        txn.complete_task(&task_id)?;
        coordinate(txn, &settings)
    })
    .await
}
