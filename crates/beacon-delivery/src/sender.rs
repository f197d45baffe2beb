// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The sender: one gateway call per batch and the atomic outcome report.

use beacon_core::{
    BeaconError, GatewayResponse, NotificationState, PushGateway, PushMessage, TaskId,
    TicketStatus,
};
use beacon_storage::{Database, Txn};
use tracing::{debug, error, warn};

use crate::coordinator::ensure_coordinator;
use crate::settings::DeliverySettings;
use crate::tasks::SendBatch;

/// Per-notification result of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The gateway accepted the message.
    Delivered,
    /// The request reached the gateway but the result is unknown.
    MaybeDelivered,
    /// Nothing was delivered; the attempt counts against the retry ceiling.
    Failed,
}

/// Maps a gateway result onto one outcome per message, in request order.
///
/// Tickets are matched by position. A response with a different number of
/// tickets than messages is logged; missing tickets count as failures.
pub fn classify(
    batch_len: usize,
    response: &Result<GatewayResponse, BeaconError>,
) -> Vec<AttemptOutcome> {
    match response {
        Err(e) => {
            error!(error = %e, messages = batch_len, "push request failed, batch will be retried");
            vec![AttemptOutcome::Failed; batch_len]
        }
        Ok(GatewayResponse::Rejected { status, body }) => {
            warn!(
                status,
                body = %body,
                messages = batch_len,
                "push request rejected, batch marked maybe delivered"
            );
            vec![AttemptOutcome::MaybeDelivered; batch_len]
        }
        Ok(GatewayResponse::Accepted(tickets)) => {
            if tickets.len() != batch_len {
                warn!(
                    tickets = tickets.len(),
                    messages = batch_len,
                    "ticket count does not match message count"
                );
            }
            (0..batch_len)
                .map(|idx| match tickets.get(idx) {
                    Some(ticket) if ticket.status == TicketStatus::Ok => {
                        AttemptOutcome::Delivered
                    }
                    Some(ticket) => {
                        debug!(
                            position = idx,
                            message = ticket.message.as_deref().unwrap_or(""),
                            "push ticket error"
                        );
                        AttemptOutcome::Failed
                    }
                    None => AttemptOutcome::Failed,
                })
                .collect()
        }
    }
}

/// Counts of what an outcome report changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub delivered: usize,
    pub maybe_delivered: usize,
    pub needs_retry: usize,
    pub unable_to_deliver: usize,
    /// Notifications no longer owned by this batch (already reconciled).
    pub stale: usize,
}

/// Records a batch's outcomes atomically.
///
/// In the same transaction: completes the send task, cancels the paired
/// reconcile task, deletes the sender record and re-ensures the coordinator.
pub fn record_outcomes(
    txn: &Txn<'_>,
    settings: &DeliverySettings,
    task_id: &TaskId,
    batch: &SendBatch,
    outcomes: &[AttemptOutcome],
) -> Result<BatchReport, BeaconError> {
    if outcomes.len() != batch.items.len() {
        return Err(BeaconError::Invariant(format!(
            "{} outcomes for a batch of {}",
            outcomes.len(),
            batch.items.len()
        )));
    }

    let mut report = BatchReport::default();
    for (item, outcome) in batch.items.iter().zip(outcomes) {
        let applied = match outcome {
            AttemptOutcome::Delivered => txn
                .settle_notification(&item.id, &batch.sender_id, NotificationState::Delivered)?
                .then_some(NotificationState::Delivered),
            AttemptOutcome::MaybeDelivered => txn
                .settle_notification(&item.id, &batch.sender_id, NotificationState::MaybeDelivered)?
                .then_some(NotificationState::MaybeDelivered),
            AttemptOutcome::Failed => txn.record_failed_attempt(
                &item.id,
                &batch.sender_id,
                settings.max_retry_attempts,
            )?,
        };
        match applied {
            Some(NotificationState::Delivered) => report.delivered += 1,
            Some(NotificationState::MaybeDelivered) => report.maybe_delivered += 1,
            Some(NotificationState::NeedsRetry) => report.needs_retry += 1,
            Some(NotificationState::UnableToDeliver) => report.unable_to_deliver += 1,
            Some(other) => {
                return Err(BeaconError::Invariant(format!(
                    "outcome report produced state {other}"
                )));
            }
            None => report.stale += 1,
        }
    }
    txn.complete_task(task_id)?;
    txn.cancel(&batch.reconcile_task_id)?;
    txn.delete_sender(&batch.sender_id)?;
    ensure_coordinator(txn, settings)?;
    Ok(report)
}

/// Runs a send task: one gateway call, then the outcome transaction.
pub async fn send_batch(
    db: &Database,
    gateway: &dyn PushGateway,
    settings: DeliverySettings,
    task_id: TaskId,
    batch: SendBatch,
) -> Result<BatchReport, BeaconError> {
    let messages: Vec<PushMessage> = batch.items.iter().map(|item| item.message.clone()).collect();
    debug!(
        sender = %batch.sender_id,
        gateway = gateway.name(),
        messages = messages.len(),
        "sending push notifications"
    );

    let response = gateway.send(&messages).await;
    let outcomes = classify(messages.len(), &response);

    let sender_id = batch.sender_id.clone();
    let report = db
        .transact(move |txn| record_outcomes(txn, &settings, &task_id, &batch, &outcomes))
        .await?;
    if report.stale > 0 {
        warn!(
            sender = %sender_id,
            stale = report.stale,
            "outcome report arrived after the batch was reconciled"
        );
    }
    debug!(sender = %sender_id, ?report, "recorded batch outcome");
    Ok(report)
}
