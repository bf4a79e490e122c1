// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;
use std::time::Duration;

use shroud_core::ShroudError;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use crate::migrations;

const IN_MEMORY: &str = ":memory:";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the vault database. Clones share the same writer thread.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
    path: String,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

impl Database {
    /// Opens (creating if needed) a WAL-mode database and runs migrations.
    pub async fn open(path: &str) -> Result<Self, ShroudError> {
        Self::open_with(path, true).await
    }

    /// Opens a private in-memory database. Mostly useful for tests.
    pub async fn open_in_memory() -> Result<Self, ShroudError> {
        Self::open_with(IN_MEMORY, false).await
    }

    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, ShroudError> {
        let conn = if path == IN_MEMORY {
            Connection::open_in_memory().await
        } else {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(ShroudError::persistence)?;
                }
            }
            Connection::open(path).await
        }
        .map_err(ShroudError::persistence)?;

        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            if wal_mode {
                let mode: String =
                    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
                debug!(journal_mode = %mode, "journal mode set");
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            // Deleted rows are overwritten with zeros, not just unlinked.
            let _: i64 =
                conn.pragma_update_and_check(None, "secure_delete", "ON", |row| row.get(0))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| migrations::run_migrations(conn))
            .await
            .map_err(map_tr_err)?;

        info!(path, wal_mode, "vault database opened");
        Ok(Self {
            conn,
            path: path.to_string(),
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Folds the WAL back into the main file and truncates it to zero bytes.
    pub async fn checkpoint(&self) -> Result<(), ShroudError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    /// Checkpoints, then closes the connection.
    pub async fn close(self) -> Result<(), ShroudError> {
        self.checkpoint().await?;
        self.conn.close().await.map_err(map_tr_err)
    }
}

/// Converts a tokio-rusqlite error into [`ShroudError::PersistenceFailed`].
pub(crate) fn map_tr_err<E>(e: tokio_rusqlite::Error<E>) -> ShroudError
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match e {
        tokio_rusqlite::Error::Error(inner) => ShroudError::persistence(inner),
        tokio_rusqlite::Error::Close((_, inner)) => ShroudError::persistence(inner),
        tokio_rusqlite::Error::ConnectionClosed => {
            ShroudError::persistence("vault database connection is closed")
        }
        _ => ShroudError::persistence("vault database connection failed"),
    }
}
