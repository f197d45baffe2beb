// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single-row admission toggle.

use beacon_core::{BeaconError, ServiceState};
use rusqlite::{params, OptionalExtension};

use crate::txn::{parse_column, Txn};

impl Txn<'_> {
    /// Current admission state; a missing row means running.
    pub fn service_state(&self) -> Result<ServiceState, BeaconError> {
        let raw: Option<String> = self
            .conn()
            .query_row("SELECT state FROM service_config WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()
            .map_err(BeaconError::storage)?;
        match raw {
            Some(raw) => parse_column(0, raw).map_err(BeaconError::storage),
            None => Ok(ServiceState::default()),
        }
    }

    pub fn set_service_state(&self, state: ServiceState) -> Result<(), BeaconError> {
        self.conn()
            .execute(
                "INSERT INTO service_config (id, state) VALUES (1, ?1)
                 ON CONFLICT(id) DO UPDATE
                 SET state = excluded.state, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![state.to_string()],
            )
            .map_err(BeaconError::storage)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use beacon_core::ServiceState;

    use crate::Database;

    #[tokio::test]
    async fn missing_row_means_running() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db")).await.unwrap();

        let states = db
            .transact(|txn| {
                let initial = txn.service_state()?;
                txn.set_service_state(ServiceState::ShuttingDown)?;
                let stopped = txn.service_state()?;
                txn.set_service_state(ServiceState::Running)?;
                Ok((initial, stopped, txn.service_state()?))
            })
            .await
            .unwrap();
        assert_eq!(
            states,
            (
                ServiceState::Running,
                ServiceState::ShuttingDown,
                ServiceState::Running
            )
        );
    }
}
