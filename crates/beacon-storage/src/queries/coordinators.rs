// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Coordinator records. The table has no uniqueness constraint; the
//! delivery layer keeps at most one live record by scan-and-prune.

use beacon_core::{BeaconError, CoordinatorRecord, TaskId};
use rusqlite::params;

use crate::txn::Txn;

impl Txn<'_> {
    /// Inserts a record pointing at `dispatch_task_id` and returns its id.
    pub fn insert_coordinator(&self, dispatch_task_id: &TaskId) -> Result<String, BeaconError> {
        let id = coordinator_key(dispatch_task_id);
        self.conn()
            .execute(
                "INSERT INTO coordinators (id, dispatch_task_id) VALUES (?1, ?2)",
                params![id, dispatch_task_id.as_str()],
            )
            .map_err(BeaconError::storage)?;
        Ok(id)
    }

    pub fn list_coordinators(&self) -> Result<Vec<CoordinatorRecord>, BeaconError> {
        let mut stmt = self
            .conn()
            .prepare(
                "SELECT id, dispatch_task_id, created_at FROM coordinators
                 ORDER BY created_at ASC, rowid ASC",
            )
            .map_err(BeaconError::storage)?;
        stmt.query_map([], |row| {
            Ok(CoordinatorRecord {
                id: row.get(0)?,
                dispatch_task_id: TaskId(row.get(1)?),
                created_at: row.get(2)?,
            })
        })
        .map_err(BeaconError::storage)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(BeaconError::storage)
    }

    pub fn delete_coordinator(&self, id: &str) -> Result<bool, BeaconError> {
        let changed = self
            .conn()
            .execute("DELETE FROM coordinators WHERE id = ?1", params![id])
            .map_err(BeaconError::storage)?;
        Ok(changed > 0)
    }
}

// One record per dispatch task, so the task id doubles as a stable key.
fn coordinator_key(dispatch_task_id: &TaskId) -> String {
    format!("coordinator-{dispatch_task_id}")
}
