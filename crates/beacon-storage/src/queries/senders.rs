// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sender records, one per in-flight delivery batch.

use beacon_core::{BeaconError, SenderId, SenderRecord, TaskId};
use rusqlite::params;

use crate::txn::Txn;

impl Txn<'_> {
    pub fn insert_sender(
        &self,
        id: &SenderId,
        dispatch_task_id: &TaskId,
        reconcile_task_id: &TaskId,
    ) -> Result<(), BeaconError> {
        self.conn()
            .execute(
                "INSERT INTO senders (id, dispatch_task_id, reconcile_task_id) VALUES (?1, ?2, ?3)",
                params![id.as_str(), dispatch_task_id.as_str(), reconcile_task_id.as_str()],
            )
            .map_err(BeaconError::storage)?;
        Ok(())
    }

    /// All sender records, oldest first.
    pub fn list_senders(&self) -> Result<Vec<SenderRecord>, BeaconError> {
        let mut stmt = self
            .conn()
            .prepare(
                "SELECT id, dispatch_task_id, reconcile_task_id, created_at
                 FROM senders ORDER BY created_at ASC, rowid ASC",
            )
            .map_err(BeaconError::storage)?;
        stmt.query_map([], |row| {
            Ok(SenderRecord {
                id: SenderId(row.get(0)?),
                dispatch_task_id: TaskId(row.get(1)?),
                reconcile_task_id: TaskId(row.get(2)?),
                created_at: row.get(3)?,
            })
        })
        .map_err(BeaconError::storage)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(BeaconError::storage)
    }

    /// Returns true if a record was removed.
    pub fn delete_sender(&self, id: &SenderId) -> Result<bool, BeaconError> {
        let changed = self
            .conn()
            .execute("DELETE FROM senders WHERE id = ?1", params![id.as_str()])
            .map_err(BeaconError::storage)?;
        Ok(changed > 0)
    }
}
