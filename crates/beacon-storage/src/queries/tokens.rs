// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push token registry, one token per user.

use beacon_core::{BeaconError, PushToken};
use rusqlite::{params, OptionalExtension};

use crate::txn::Txn;

impl Txn<'_> {
    pub fn get_token(&self, user_id: &str) -> Result<Option<PushToken>, BeaconError> {
        self.conn()
            .query_row(
                "SELECT user_id, token, notifications_paused FROM push_tokens WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(PushToken {
                        user_id: row.get(0)?,
                        token: row.get(1)?,
                        notifications_paused: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(BeaconError::storage)
    }

    /// Registers `token` for `user_id`, replacing any existing token.
    ///
    /// The pause flag survives a replacement. Returns true if a token was
    /// replaced.
    pub fn upsert_token(&self, user_id: &str, token: &str) -> Result<bool, BeaconError> {
        let replaced = self
            .conn()
            .execute(
                "UPDATE push_tokens
                 SET token = ?2, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE user_id = ?1",
                params![user_id, token],
            )
            .map_err(BeaconError::storage)?
            > 0;
        if !replaced {
            self.conn()
                .execute(
                    "INSERT INTO push_tokens (user_id, token, notifications_paused)
                     VALUES (?1, ?2, 0)",
                    params![user_id, token],
                )
                .map_err(BeaconError::storage)?;
        }
        Ok(replaced)
    }

    /// Returns true if a token was removed.
    pub fn delete_token(&self, user_id: &str) -> Result<bool, BeaconError> {
        let changed = self
            .conn()
            .execute("DELETE FROM push_tokens WHERE user_id = ?1", params![user_id])
            .map_err(BeaconError::storage)?;
        Ok(changed > 0)
    }

    /// Sets the pause flag. Returns false when the user has no token.
    pub fn set_paused(&self, user_id: &str, paused: bool) -> Result<bool, BeaconError> {
        let changed = self
            .conn()
            .execute(
                "UPDATE push_tokens
                 SET notifications_paused = ?2, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE user_id = ?1",
                params![user_id, paused],
            )
            .map_err(BeaconError::storage)?;
        Ok(changed > 0)
    }
}
