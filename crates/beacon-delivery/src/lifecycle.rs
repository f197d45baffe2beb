// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown and restart of the delivery pipeline.
//!
//! Senders that are already calling the gateway cannot be interrupted. They
//! are left to finish, and admission stays closed until a restart finds none
//! of them running.

use beacon_core::{BeaconError, SenderId, ServiceState, ShutdownOutcome, TaskStatus};
use beacon_storage::Txn;
use tracing::{debug, error, info};

use crate::coordinator::ensure_coordinator;
use crate::settings::DeliverySettings;

/// What [`drain_senders`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub coordinators_stopped: usize,
    pub senders_canceled: usize,
    pub senders_cleaned: usize,
    /// Senders whose gateway call is running and was left to finish.
    pub draining: Vec<SenderId>,
}

/// Stops the coordinator and every sender that has not started.
///
/// A canceled sender never reached the gateway, so its notifications go back
/// to `needs_retry` without counting an attempt.
pub fn drain_senders(txn: &Txn<'_>) -> Result<DrainReport, BeaconError> {
    let mut report = DrainReport::default();

    for coordinator in txn.list_coordinators()? {
        info!(coordinator = %coordinator.id, "stopping coordinator");
        txn.cancel(&coordinator.dispatch_task_id)?;
        txn.delete_coordinator(&coordinator.id)?;
        report.coordinators_stopped += 1;
    }

    for sender in txn.list_senders()? {
        match txn.task_status(&sender.dispatch_task_id)? {
            TaskStatus::Pending => {
                info!(sender = %sender.id, "stopping sender");
                txn.cancel(&sender.dispatch_task_id)?;
                txn.cancel(&sender.reconcile_task_id)?;
                let released = txn.release_batch(&sender.id)?;
                txn.delete_sender(&sender.id)?;
                debug!(sender = %sender.id, released, "returned unsent batch to the queue");
                report.senders_canceled += 1;
            }
            TaskStatus::InProgress => report.draining.push(sender.id),
            TaskStatus::Unknown => {
                error!(sender = %sender.id, "sender has no task, cleaning up");
                txn.delete_sender(&sender.id)?;
                report.senders_cleaned += 1;
            }
            status => {
                debug!(sender = %sender.id, %status, "sender already finished, cleaning up");
                txn.delete_sender(&sender.id)?;
                report.senders_cleaned += 1;
            }
        }
    }

    Ok(report)
}

/// Stops the pipeline. Closes admission when senders are still running.
pub fn shutdown(txn: &Txn<'_>) -> Result<ShutdownOutcome, BeaconError> {
    let report = drain_senders(txn)?;
    if report.draining.is_empty() {
        info!(
            coordinators = report.coordinators_stopped,
            senders = report.senders_canceled,
            "delivery stopped"
        );
        return Ok(ShutdownOutcome::Stopped);
    }

    txn.set_service_state(ServiceState::ShuttingDown)?;
    info!(
        draining = report.draining.len(),
        "delivery shutting down, waiting for running senders"
    );
    Ok(ShutdownOutcome::Draining {
        sender_ids: report.draining,
    })
}

/// Reopens admission and restarts coordination once no sender is running.
///
/// Returns false, changing nothing but the drain itself, while any sender is
/// still running.
pub fn restart(txn: &Txn<'_>, settings: &DeliverySettings) -> Result<bool, BeaconError> {
    let report = drain_senders(txn)?;
    if !report.draining.is_empty() {
        error!(
            draining = report.draining.len(),
            "senders are still running, wait for them to finish and restart again"
        );
        return Ok(false);
    }

    txn.set_service_state(ServiceState::Running)?;
    ensure_coordinator(txn, settings)?;
    info!("delivery restarted");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use beacon_storage::Database;

    use super::*;
    use crate::tasks::ScheduledTask;

    #[tokio::test]
    async fn shutdown_with_nothing_running_stops_without_closing_admission() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db")).await.unwrap();

        let (outcome, state, coordinators) = db
            .transact(|txn| {
                ensure_coordinator(txn, &DeliverySettings::default())?;
                let outcome = shutdown(txn)?;
                Ok((outcome, txn.service_state()?, txn.list_coordinators()?.len()))
            })
            .await
            .unwrap();
        assert_eq!(outcome, ShutdownOutcome::Stopped);
        assert_eq!(state, ServiceState::Running);
        assert_eq!(coordinators, 0);
    }

    #[tokio::test]
    async fn finished_and_orphaned_senders_are_cleaned() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db")).await.unwrap();

        let report = db
            .transact(|txn| {
                let done = ScheduledTask::Coordinate.schedule(txn, Duration::ZERO)?;
                txn.cancel(&done)?;
                let reconcile = ScheduledTask::Coordinate.schedule(txn, Duration::from_secs(10))?;
                txn.insert_sender(&SenderId::from("finished"), &done, &reconcile)?;
                txn.insert_sender(
                    &SenderId::from("orphan"),
                    &beacon_core::TaskId::from("missing"),
                    &reconcile,
                )?;
                let report = drain_senders(txn)?;
                Ok((report, txn.list_senders()?.len()))
            })
            .await
            .unwrap();
        assert_eq!(report.0.senders_cleaned, 2);
        assert!(report.0.draining.is_empty());
        assert_eq!(report.1, 0);
    }
}
