// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes: the
//! `Database` struct IS the single writer, and transactions inside one
//! `call` closure are the unit of atomicity.

use tidedesk_core::TidedeskError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Convert tokio-rusqlite errors into the storage error variant.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> TidedeskError {
    TidedeskError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the support database.
///
/// Wraps a single `tokio_rusqlite::Connection`. Query modules accept
/// `&Database` and go through [`Database::connection`], which serializes all
/// closure calls on one background thread and eliminates SQLITE_BUSY errors
/// under concurrent access. Cloning shares the same background connection.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run
    /// pending migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, TidedeskError> {
        let conn = Connection::open(path).await.map_err(map_tr_err)?;
        let db = Self::initialize(conn, wal_mode).await?;
        debug!(path, wal_mode, "support database opened");
        Ok(db)
    }

    /// Open an in-memory database. Test and tooling use only.
    pub async fn open_in_memory() -> Result<Self, TidedeskError> {
        let conn = Connection::open_in_memory().await.map_err(map_tr_err)?;
        Self::initialize(conn, false).await
    }

    async fn initialize(conn: Connection, wal_mode: bool) -> Result<Self, TidedeskError> {
        conn.call(move |conn| {
            if wal_mode {
                conn.execute_batch(
                    "PRAGMA journal_mode=WAL;
                     PRAGMA synchronous=NORMAL;",
                )?;
            }
            conn.execute_batch(
                "PRAGMA foreign_keys=ON;
                 PRAGMA busy_timeout=5000;",
            )?;
            migrations::run_migrations(conn)
                .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
        Ok(Self { conn })
    }

    /// The underlying serialized connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), TidedeskError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(map_tr_err)?;
        debug!("support database closed");
        Ok(())
    }
}
