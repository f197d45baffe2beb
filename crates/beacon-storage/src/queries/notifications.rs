// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification records and their state transitions.
//!
//! Outcome writes are guarded on `state = 'in_progress' AND sender_id = ?`,
//! so only the batch that currently owns a record can settle it.

use beacon_core::{
    BeaconError, Notification, NotificationFields, NotificationId, NotificationState, SenderId,
};
use rusqlite::{params, OptionalExtension};

use crate::txn::{json_column, parse_column, Txn};

const NOTIFICATION_COLUMNS: &str = "id, user_id, token, metadata, state, \
     num_previous_failures, sender_id, created_at, updated_at";

fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: NotificationId(row.get(0)?),
        user_id: row.get(1)?,
        token: row.get(2)?,
        metadata: json_column(3, row.get(3)?)?,
        state: parse_column(4, row.get(4)?)?,
        num_previous_failures: row.get(5)?,
        sender_id: row.get::<_, Option<String>>(6)?.map(SenderId),
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

impl Txn<'_> {
    /// Inserts a notification in `awaiting_delivery` with no failures.
    pub fn insert_notification(
        &self,
        user_id: &str,
        token: &str,
        fields: &NotificationFields,
    ) -> Result<NotificationId, BeaconError> {
        let id = NotificationId::generate();
        let metadata = serde_json::to_string(fields).map_err(BeaconError::serialization)?;
        self.conn()
            .execute(
                "INSERT INTO notifications (id, user_id, token, metadata, state, num_previous_failures)
                 VALUES (?1, ?2, ?3, ?4, 'awaiting_delivery', 0)",
                params![id.as_str(), user_id, token, metadata],
            )
            .map_err(BeaconError::storage)?;
        Ok(id)
    }

    pub fn get_notification(&self, id: &NotificationId) -> Result<Option<Notification>, BeaconError> {
        self.conn()
            .query_row(
                &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"),
                params![id.as_str()],
                row_to_notification,
            )
            .optional()
            .map_err(BeaconError::storage)
    }

    /// Oldest notifications in `state`, up to `limit`.
    pub fn oldest_in_state(
        &self,
        state: NotificationState,
        limit: usize,
    ) -> Result<Vec<Notification>, BeaconError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut stmt = self
            .conn()
            .prepare(&format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                 WHERE state = ?1
                 ORDER BY created_at ASC, rowid ASC
                 LIMIT ?2"
            ))
            .map_err(BeaconError::storage)?;
        stmt.query_map(params![state.to_string(), limit as i64], row_to_notification)
            .map_err(BeaconError::storage)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(BeaconError::storage)
    }

    /// Hands a queued notification to a batch.
    pub fn mark_in_progress(&self, id: &NotificationId, sender: &SenderId) -> Result<bool, BeaconError> {
        let changed = self
            .conn()
            .execute(
                "UPDATE notifications
                 SET state = 'in_progress', sender_id = ?2,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND state IN ('awaiting_delivery', 'needs_retry')",
                params![id.as_str(), sender.as_str()],
            )
            .map_err(BeaconError::storage)?;
        Ok(changed > 0)
    }

    /// Abandons a queued notification that has exhausted its attempts.
    pub fn mark_unable_to_deliver(&self, id: &NotificationId) -> Result<bool, BeaconError> {
        let changed = self
            .conn()
            .execute(
                "UPDATE notifications
                 SET state = 'unable_to_deliver', sender_id = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND state IN ('awaiting_delivery', 'needs_retry')",
                params![id.as_str()],
            )
            .map_err(BeaconError::storage)?;
        Ok(changed > 0)
    }

    /// Settles an owned `in_progress` record into `delivered` or
    /// `maybe_delivered` without touching the failure count.
    ///
    /// Returns false when the record is gone, already settled, or owned by a
    /// different batch.
    pub fn settle_notification(
        &self,
        id: &NotificationId,
        sender: &SenderId,
        state: NotificationState,
    ) -> Result<bool, BeaconError> {
        if !matches!(
            state,
            NotificationState::Delivered | NotificationState::MaybeDelivered
        ) {
            return Err(BeaconError::Invariant(format!(
                "cannot settle notification {id} into {state}"
            )));
        }
        let changed = self
            .conn()
            .execute(
                "UPDATE notifications
                 SET state = ?3, sender_id = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND sender_id = ?2 AND state = 'in_progress'",
                params![id.as_str(), sender.as_str(), state.to_string()],
            )
            .map_err(BeaconError::storage)?;
        Ok(changed > 0)
    }

    /// Records one failed attempt on an owned `in_progress` record.
    ///
    /// The failure count grows by exactly one. The record moves to
    /// `unable_to_deliver` once the count reaches `max_attempts`, otherwise to
    /// `needs_retry`. Returns the new state, or `None` if the record was not
    /// owned by `sender`.
    pub fn record_failed_attempt(
        &self,
        id: &NotificationId,
        sender: &SenderId,
        max_attempts: u32,
    ) -> Result<Option<NotificationState>, BeaconError> {
        let raw: Option<String> = self
            .conn()
            .query_row(
                "UPDATE notifications
                 SET num_previous_failures = num_previous_failures + 1,
                     state = CASE WHEN num_previous_failures + 1 >= ?3
                                  THEN 'unable_to_deliver' ELSE 'needs_retry' END,
                     sender_id = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND sender_id = ?2 AND state = 'in_progress'
                 RETURNING state",
                params![id.as_str(), sender.as_str(), max_attempts],
                |row| row.get(0),
            )
            .optional()
            .map_err(BeaconError::storage)?;
        raw.map(|raw| parse_column(0, raw).map_err(BeaconError::storage))
            .transpose()
    }

    /// Returns a batch that never reached the gateway to the retry queue.
    ///
    /// The failure count is left unchanged since no attempt was made.
    pub fn release_batch(&self, sender: &SenderId) -> Result<usize, BeaconError> {
        self.conn()
            .execute(
                "UPDATE notifications
                 SET state = 'needs_retry', sender_id = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE sender_id = ?1 AND state = 'in_progress'",
                params![sender.as_str()],
            )
            .map_err(BeaconError::storage)
    }

    /// A user's notifications, newest first.
    pub fn notifications_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Notification>, BeaconError> {
        let mut stmt = self
            .conn()
            .prepare(&format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2"
            ))
            .map_err(BeaconError::storage)?;
        stmt.query_map(params![user_id, limit as i64], row_to_notification)
            .map_err(BeaconError::storage)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(BeaconError::storage)
    }

    /// Deletes every notification of a user. Returns the number removed.
    pub fn delete_notifications_for_user(&self, user_id: &str) -> Result<usize, BeaconError> {
        self.conn()
            .execute(
                "DELETE FROM notifications WHERE user_id = ?1",
                params![user_id],
            )
            .map_err(BeaconError::storage)
    }
}
