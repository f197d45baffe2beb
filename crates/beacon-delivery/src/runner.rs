// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The durable task runner.
//!
//! Claims due tasks from the `scheduled_tasks` table and runs each on the
//! tokio runtime. Coordination and reconciliation complete their task inside
//! their own transaction; a send task completes inside its outcome report.

use std::sync::Arc;
use std::time::{Duration, Instant};

use beacon_config::model::RunnerConfig;
use beacon_core::{BeaconError, PushGateway, TaskId};
use beacon_storage::{Database, RecoveryReport, StoredTask};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::coordinator::run_coordination;
use crate::reconciler::reconcile;
use crate::sender::send_batch;
use crate::settings::DeliverySettings;
use crate::tasks::{ScheduledTask, REPEATABLE_KINDS};

/// Maximum tasks claimed per poll.
const CLAIM_LIMIT: usize = 64;

/// How often finished task rows are purged.
const PURGE_INTERVAL: Duration = Duration::from_secs(300);

type HandlerResult = Result<(), BeaconError>;

/// Executes scheduled tasks until cancelled.
#[derive(Clone)]
pub struct TaskRunner {
    db: Database,
    gateway: Arc<dyn PushGateway>,
    settings: DeliverySettings,
    config: RunnerConfig,
    runner_id: String,
}

impl TaskRunner {
    pub fn new(
        db: Database,
        gateway: Arc<dyn PushGateway>,
        settings: DeliverySettings,
        config: RunnerConfig,
    ) -> Self {
        Self {
            db,
            gateway,
            settings,
            config,
            runner_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Identifier stamped on tasks this runner claims.
    pub fn runner_id(&self) -> &str {
        &self.runner_id
    }

    /// Resolves tasks a previous runner left `in_progress`.
    ///
    /// Coordination and reconciliation are requeued. Send tasks are failed:
    /// their gateway call may have happened, and the paired reconcile task
    /// resolves their batch.
    pub async fn recover(&self) -> Result<RecoveryReport, BeaconError> {
        let runner_id = self.runner_id.clone();
        let report = self
            .db
            .transact(move |txn| txn.recover_abandoned(&runner_id, REPEATABLE_KINDS))
            .await?;
        if report != RecoveryReport::default() {
            warn!(
                requeued = report.requeued,
                failed = report.failed,
                "recovered tasks abandoned by a previous runner"
            );
        }
        Ok(report)
    }

    /// Claims every due task and runs them to completion.
    ///
    /// Returns the number of tasks run. Handler failures are recorded on the
    /// task rows, not returned.
    pub async fn run_due(&self) -> Result<usize, BeaconError> {
        let claimed = self.claim().await?;
        let count = claimed.len();
        let mut handlers = JoinSet::new();
        for task in claimed {
            self.spawn(&mut handlers, task);
        }
        while let Some(joined) = handlers.join_next().await {
            log_join(joined);
        }
        Ok(count)
    }

    /// Runs one pending task now, regardless of when it is due.
    ///
    /// Returns false if the task is not pending.
    pub async fn run_task(&self, id: &TaskId) -> Result<bool, BeaconError> {
        let id = id.clone();
        let runner_id = self.runner_id.clone();
        let claimed = self
            .db
            .transact(move |txn| txn.claim_task(&id, &runner_id))
            .await?;
        match claimed {
            Some(task) => {
                self.execute(task).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Main loop: recover, then claim and spawn due tasks until `cancel` fires.
    ///
    /// On cancellation no more tasks are claimed and running handlers get up
    /// to the configured drain timeout to finish.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), BeaconError> {
        let recovered = self.recover().await?;
        info!(
            runner = %self.runner_id,
            requeued = recovered.requeued,
            failed = recovered.failed,
            "task runner started"
        );

        let wake = self.db.task_wake();
        let mut handlers: JoinSet<HandlerResult> = JoinSet::new();
        let mut last_purge: Option<Instant> = None;

        while !cancel.is_cancelled() {
            while let Some(joined) = handlers.try_join_next() {
                log_join(joined);
            }

            match self.claim().await {
                Ok(claimed) => {
                    let saturated = claimed.len() == CLAIM_LIMIT;
                    for task in claimed {
                        self.spawn(&mut handlers, task);
                    }
                    if saturated {
                        continue;
                    }
                }
                Err(e) => error!(error = %e, "failed to claim due tasks"),
            }

            if last_purge.is_none_or(|at| at.elapsed() >= PURGE_INTERVAL) {
                self.purge().await;
                last_purge = Some(Instant::now());
            }

            let delay = self.idle_delay().await;
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = wake.notified() => {}
                _ = tokio::time::sleep(delay) => {}
                Some(joined) = handlers.join_next(), if !handlers.is_empty() => log_join(joined),
            }
        }

        self.drain(handlers).await;
        info!(runner = %self.runner_id, "task runner stopped");
        Ok(())
    }

    async fn claim(&self) -> Result<Vec<StoredTask>, BeaconError> {
        let runner_id = self.runner_id.clone();
        let claimed = self
            .db
            .transact(move |txn| txn.claim_due(&runner_id, CLAIM_LIMIT))
            .await?;
        if !claimed.is_empty() {
            debug!(count = claimed.len(), "claimed due tasks");
        }
        Ok(claimed)
    }

    fn spawn(&self, handlers: &mut JoinSet<HandlerResult>, task: StoredTask) {
        let runner = self.clone();
        handlers.spawn(async move { runner.execute(task).await });
    }

    async fn execute(&self, task: StoredTask) -> HandlerResult {
        let id = task.id.clone();
        debug!(task = %id, kind = %task.kind, "running task");

        let result = match ScheduledTask::from_stored(&task) {
            Ok(ScheduledTask::Coordinate) => {
                run_coordination(&self.db, self.settings, id.clone())
                    .await
                    .map(|outcome| debug!(task = %id, ?outcome, "coordination step finished"))
            }
            Ok(ScheduledTask::SendBatch(batch)) => send_batch(
                &self.db,
                self.gateway.as_ref(),
                self.settings,
                id.clone(),
                batch,
            )
            .await
            .map(|_| ()),
            Ok(ScheduledTask::Reconcile(batch)) => {
                reconcile(&self.db, self.settings, id.clone(), batch)
                    .await
                    .map(|_| ())
            }
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            error!(task = %id, kind = %task.kind, error = %e, "task failed");
            let message = e.to_string();
            let failed_id = id.clone();
            if let Err(e) = self
                .db
                .transact(move |txn| txn.fail_task(&failed_id, &message))
                .await
            {
                error!(task = %id, error = %e, "failed to record task failure");
            }
        }
        result
    }

    async fn idle_delay(&self) -> Duration {
        let poll = self.config.poll_interval();
        match self
            .db
            .transact(|txn| Ok((txn.next_run_at()?, txn.now_ms())))
            .await
        {
            Ok((Some(next), now)) => {
                Duration::from_millis(u64::try_from(next - now).unwrap_or(0)).min(poll)
            }
            Ok((None, _)) => poll,
            Err(e) => {
                warn!(error = %e, "failed to read next task time");
                poll
            }
        }
    }

    async fn purge(&self) {
        let retention = self.config.task_retention();
        match self
            .db
            .transact(move |txn| txn.purge_finished_tasks(retention))
            .await
        {
            Ok(0) => {}
            Ok(purged) => debug!(purged, "purged finished tasks"),
            Err(e) => warn!(error = %e, "failed to purge finished tasks"),
        }
    }

    async fn drain(&self, mut handlers: JoinSet<HandlerResult>) {
        if handlers.is_empty() {
            info!("no running tasks to drain");
            return;
        }

        info!(count = handlers.len(), "waiting for running tasks to complete");
        let drained = tokio::time::timeout(self.config.drain_timeout(), async {
            while let Some(joined) = handlers.join_next().await {
                log_join(joined);
            }
        })
        .await;

        if drained.is_ok() {
            info!("all running tasks drained");
        } else {
            warn!(
                remaining = handlers.len(),
                "drain timeout reached, abandoning running tasks"
            );
            handlers.abort_all();
        }
    }
}

fn log_join(joined: Result<HandlerResult, JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "task handler panicked");
    }
}
