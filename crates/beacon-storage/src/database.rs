// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All access is serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use beacon_config::model::StorageConfig;
use beacon_core::BeaconError;
use rusqlite::TransactionBehavior;
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::migrations::run_migrations;
use crate::txn::Txn;

/// Convert a tokio-rusqlite error into [`BeaconError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> BeaconError {
    BeaconError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the Beacon SQLite database.
///
/// Cloning is cheap; clones share the writer thread and the task wake-up
/// signal.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
    task_wake: Arc<Notify>,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs and migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, BeaconError> {
        Self::open_with(path.as_ref(), true).await
    }

    /// Open the database described by the `[storage]` config section.
    pub async fn open_with_config(config: &StorageConfig) -> Result<Self, BeaconError> {
        let path = Path::new(&config.database_path);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(BeaconError::storage)?;
        }
        Self::open_with(path, config.wal_mode).await
    }

    async fn open_with(path: &Path, wal_mode: bool) -> Result<Self, BeaconError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(BeaconError::storage)?;

        conn.call(move |conn| {
            if wal_mode {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(Duration::from_secs(5))?;
            Ok::<_, rusqlite::Error>(run_migrations(conn))
        })
        .await
        .map_err(map_tr_err)??;

        info!(path = %path.display(), wal_mode, "database opened");
        Ok(Self {
            conn,
            task_wake: Arc::new(Notify::new()),
        })
    }

    /// Returns the underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Signal raised after a committed transaction scheduled a task.
    pub fn task_wake(&self) -> Arc<Notify> {
        Arc::clone(&self.task_wake)
    }

    /// Runs `f` inside one `IMMEDIATE` transaction on the writer thread.
    ///
    /// Commits when `f` returns `Ok`; any `Err` rolls back every write made
    /// through the [`Txn`], including scheduled and canceled tasks.
    pub async fn transact<R, F>(&self, f: F) -> Result<R, BeaconError>
    where
        F: FnOnce(&Txn<'_>) -> Result<R, BeaconError> + Send + 'static,
        R: Send + 'static,
    {
        let (result, scheduled) = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let (result, scheduled) = {
                    let txn = Txn::new(&tx);
                    let result = f(&txn);
                    (result, txn.scheduled_any())
                };
                if result.is_ok() {
                    tx.commit()?;
                }
                Ok::<_, rusqlite::Error>((result, scheduled))
            })
            .await
            .map_err(map_tr_err)?;

        if scheduled && result.is_ok() {
            self.task_wake.notify_one();
        }
        result
    }

    /// Close the database connection, flushing the WAL.
    pub async fn close(self) -> Result<(), BeaconError> {
        self.conn
            .call(|conn| conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);"))
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(map_tr_err)?;
        debug!("database closed");
        Ok(())
    }
}
