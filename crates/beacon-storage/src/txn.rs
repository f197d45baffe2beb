// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The transaction handle passed to every store and scheduler operation.
//!
//! Query modules extend [`Txn`] with typed operations; see `crate::queries`.

use std::cell::Cell;
use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::Connection;

/// An open `IMMEDIATE` transaction on the writer thread.
///
/// Only obtainable through [`crate::Database::transact`], so every write made
/// with it commits or rolls back as a unit.
pub struct Txn<'a> {
    conn: &'a Connection,
    now_ms: i64,
    scheduled: Cell<bool>,
}

impl<'a> Txn<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            now_ms: chrono::Utc::now().timestamp_millis(),
            scheduled: Cell::new(false),
        }
    }

    /// Wall-clock time at which the transaction began, in Unix milliseconds.
    ///
    /// Fixed for the lifetime of the transaction.
    pub fn now_ms(&self) -> i64 {
        self.now_ms
    }

    pub(crate) fn conn(&self) -> &Connection {
        self.conn
    }

    pub(crate) fn mark_scheduled(&self) {
        self.scheduled.set(true);
    }

    pub(crate) fn scheduled_any(&self) -> bool {
        self.scheduled.get()
    }
}

/// Parses a TEXT column through `FromStr`, reporting failures as conversion
/// errors on that column.
pub(crate) fn parse_column<T>(idx: usize, raw: String) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Decodes a JSON TEXT column.
pub(crate) fn json_column<T>(idx: usize, raw: String) -> rusqlite::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// ISO-8601 timestamp in the same shape SQLite's
/// `strftime('%Y-%m-%dT%H:%M:%fZ')` produces.
pub(crate) fn iso_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
