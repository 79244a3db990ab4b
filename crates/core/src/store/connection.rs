//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite database, applying required pragmas
//! for performance and concurrency (WAL mode), and running migrations. The
//! connection is established lazily and exactly once.

use super::migrations;
use crate::Error;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tokio_rusqlite::{Connection, rusqlite};

#[derive(Debug, Clone)]
enum Target {
    File(PathBuf),
    Memory,
}

/// SQLite-backed entry store.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread. Entries are scoped to one collection, so several
/// stores may share a database file.
#[derive(Debug)]
pub struct SqliteStore {
    target: Target,
    pub(crate) collection: String,
    conn: OnceCell<Connection>,
}

impl SqliteStore {
    /// Store backed by the database file at `path`.
    ///
    /// Nothing is touched on disk until the first operation or [`open`](Self::open).
    pub fn new(path: impl AsRef<Path>, collection: impl Into<String>) -> Self {
        Self { target: Target::File(path.as_ref().to_path_buf()), collection: collection.into(), conn: OnceCell::new() }
    }

    /// Store backed by a private in-memory database.
    pub fn in_memory(collection: impl Into<String>) -> Self {
        Self { target: Target::Memory, collection: collection.into(), conn: OnceCell::new() }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Open (once) and return the shared connection.
    pub(crate) async fn connection(&self) -> Result<&Connection, Error> {
        self.conn.get_or_try_init(|| self.connect()).await
    }

    /// Whether the connection has been established.
    pub fn is_open(&self) -> bool {
        self.conn.initialized()
    }

    async fn connect(&self) -> Result<Connection, Error> {
        let conn = match &self.target {
            Target::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await.map_err(|e| {
                        tracing::warn!(path = %parent.display(), error = %e, "failed to create cache directory");
                        Error::Storage(tokio_rusqlite::Error::Error(rusqlite::Error::InvalidPath(parent.to_path_buf())))
                    })?;
                }
                Connection::open(path).await.map_err(|e| Error::Storage(e.into()))?
            }
            Target::Memory => Connection::open_in_memory()
                .await
                .map_err(|e| Error::Storage(e.into()))?,
        };

        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA temp_store=MEMORY;
                 PRAGMA foreign_keys=ON;",
            )?;
            Ok(())
        })
        .await
        .map_err(Error::Storage)?;

        migrations::run(&conn).await?;

        tracing::debug!(backend = ?self.target, collection = %self.collection, "entry store opened");

        Ok(conn)
    }
}
