// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable scheduler operations over the `scheduled_tasks` table.
//!
//! Scheduling and cancellation run inside the caller's transaction, so a task
//! becomes visible to the runner exactly when the records referencing it do.

use std::time::Duration;

use beacon_core::{BeaconError, TaskId, TaskStatus};
use rusqlite::{params, OptionalExtension};

use crate::models::{RecoveryReport, StoredTask};
use crate::txn::{iso_timestamp, parse_column, Txn};

const TASK_COLUMNS: &str = "id, kind, payload, state, run_at, claimed_by, error";

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredTask> {
    Ok(StoredTask {
        id: TaskId(row.get(0)?),
        kind: row.get(1)?,
        payload: row.get(2)?,
        state: parse_column(3, row.get(3)?)?,
        run_at: row.get(4)?,
        claimed_by: row.get(5)?,
        error: row.get(6)?,
    })
}

impl Txn<'_> {
    /// Schedules a task to become due after `delay`.
    pub fn schedule(&self, delay: Duration, kind: &str, payload: &str) -> Result<TaskId, BeaconError> {
        let id = TaskId::generate();
        let delay_ms = i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
        let run_at = self.now_ms().saturating_add(delay_ms);
        self.conn()
            .execute(
                "INSERT INTO scheduled_tasks (id, kind, payload, state, run_at)
                 VALUES (?1, ?2, ?3, 'pending', ?4)",
                params![id.as_str(), kind, payload, run_at],
            )
            .map_err(BeaconError::storage)?;
        self.mark_scheduled();
        Ok(id)
    }

    /// Cancels a task that has not started. Returns false when the task is
    /// running, finished, or unknown.
    pub fn cancel(&self, id: &TaskId) -> Result<bool, BeaconError> {
        let changed = self
            .conn()
            .execute(
                "UPDATE scheduled_tasks
                 SET state = 'canceled', updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND state = 'pending'",
                params![id.as_str()],
            )
            .map_err(BeaconError::storage)?;
        Ok(changed > 0)
    }

    /// Current status of a task; [`TaskStatus::Unknown`] for ids that do not resolve.
    pub fn task_status(&self, id: &TaskId) -> Result<TaskStatus, BeaconError> {
        let raw: Option<String> = self
            .conn()
            .query_row(
                "SELECT state FROM scheduled_tasks WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(BeaconError::storage)?;
        match raw {
            Some(raw) => parse_column(0, raw).map_err(BeaconError::storage),
            None => Ok(TaskStatus::Unknown),
        }
    }

    pub fn get_task(&self, id: &TaskId) -> Result<Option<StoredTask>, BeaconError> {
        self.conn()
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM scheduled_tasks WHERE id = ?1"),
                params![id.as_str()],
                row_to_task,
            )
            .optional()
            .map_err(BeaconError::storage)
    }

    /// Claims up to `limit` due tasks for `runner_id`, oldest `run_at` first.
    pub fn claim_due(&self, runner_id: &str, limit: usize) -> Result<Vec<StoredTask>, BeaconError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM scheduled_tasks
                 WHERE state = 'pending' AND run_at <= ?1
                 ORDER BY run_at ASC
                 LIMIT ?2"
            ))
            .map_err(BeaconError::storage)?;
        let due = stmt
            .query_map(params![self.now_ms(), limit as i64], row_to_task)
            .map_err(BeaconError::storage)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(BeaconError::storage)?;

        let mut claimed = Vec::with_capacity(due.len());
        for mut task in due {
            conn.execute(
                "UPDATE scheduled_tasks
                 SET state = 'in_progress', claimed_by = ?2,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![task.id.as_str(), runner_id],
            )
            .map_err(BeaconError::storage)?;
            task.state = TaskStatus::InProgress;
            task.claimed_by = Some(runner_id.to_string());
            claimed.push(task);
        }
        Ok(claimed)
    }

    /// Claims one specific pending task regardless of its `run_at`.
    ///
    /// Returns `None` when the task is not pending.
    pub fn claim_task(&self, id: &TaskId, runner_id: &str) -> Result<Option<StoredTask>, BeaconError> {
        let changed = self
            .conn()
            .execute(
                "UPDATE scheduled_tasks
                 SET state = 'in_progress', claimed_by = ?2,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND state = 'pending'",
                params![id.as_str(), runner_id],
            )
            .map_err(BeaconError::storage)?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_task(id)
    }

    /// Marks a running task completed. Returns false if it was not running.
    pub fn complete_task(&self, id: &TaskId) -> Result<bool, BeaconError> {
        self.finish_task(id, TaskStatus::Completed, None)
    }

    /// Marks a running task failed with an error description.
    pub fn fail_task(&self, id: &TaskId, error: &str) -> Result<bool, BeaconError> {
        self.finish_task(id, TaskStatus::Failed, Some(error))
    }

    fn finish_task(
        &self,
        id: &TaskId,
        state: TaskStatus,
        error: Option<&str>,
    ) -> Result<bool, BeaconError> {
        let changed = self
            .conn()
            .execute(
                "UPDATE scheduled_tasks
                 SET state = ?2, error = ?3, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND state = 'in_progress'",
                params![id.as_str(), state.to_string(), error],
            )
            .map_err(BeaconError::storage)?;
        Ok(changed > 0)
    }

    /// Resolves tasks left `in_progress` by runners other than `runner_id`.
    ///
    /// Kinds listed in `requeue_kinds` return to `pending`; every other kind is
    /// marked `failed`.
    pub fn recover_abandoned(
        &self,
        runner_id: &str,
        requeue_kinds: &[&str],
    ) -> Result<RecoveryReport, BeaconError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, kind FROM scheduled_tasks
                 WHERE state = 'in_progress' AND (claimed_by IS NULL OR claimed_by != ?1)",
            )
            .map_err(BeaconError::storage)?;
        let abandoned = stmt
            .query_map(params![runner_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(BeaconError::storage)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(BeaconError::storage)?;

        let mut report = RecoveryReport::default();
        for (id, kind) in abandoned {
            if requeue_kinds.contains(&kind.as_str()) {
                conn.execute(
                    "UPDATE scheduled_tasks
                     SET state = 'pending', claimed_by = NULL,
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?1",
                    params![id],
                )
                .map_err(BeaconError::storage)?;
                report.requeued += 1;
            } else {
                conn.execute(
                    "UPDATE scheduled_tasks
                     SET state = 'failed', error = 'abandoned by a previous runner',
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?1",
                    params![id],
                )
                .map_err(BeaconError::storage)?;
                report.failed += 1;
            }
        }
        Ok(report)
    }

    /// Earliest `run_at` among pending tasks.
    pub fn next_run_at(&self) -> Result<Option<i64>, BeaconError> {
        self.conn()
            .query_row(
                "SELECT MIN(run_at) FROM scheduled_tasks WHERE state = 'pending'",
                [],
                |row| row.get(0),
            )
            .map_err(BeaconError::storage)
    }

    /// Deletes finished task rows last touched more than `older_than` ago.
    pub fn purge_finished_tasks(&self, older_than: Duration) -> Result<usize, BeaconError> {
        let age = chrono::Duration::from_std(older_than)
            .unwrap_or_else(|_| chrono::Duration::days(36_500));
        let cutoff = chrono::Utc::now()
            .checked_sub_signed(age)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC);
        self.conn()
            .execute(
                "DELETE FROM scheduled_tasks
                 WHERE state IN ('completed', 'failed', 'canceled') AND updated_at < ?1",
                params![iso_timestamp(cutoff)],
            )
            .map_err(BeaconError::storage)
    }
}
