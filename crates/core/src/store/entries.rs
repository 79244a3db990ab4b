//! Entry CRUD operations for the SQLite store.
//!
//! Provides the [`EntryStore`] implementation for [`SqliteStore`]. Every
//! statement is scoped to the store's collection.

use super::connection::SqliteStore;
use super::{CacheEntry, EntryMetadata, EntryStore};
use crate::Error;
use async_trait::async_trait;
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

const METADATA_COLUMNS: &str = "url, stored_at, expires_at, size, validator, content_type";

fn metadata_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryMetadata> {
    Ok(EntryMetadata {
        url: row.get(0)?,
        stored_at: row.get(1)?,
        expires_at: row.get(2)?,
        size: row.get::<_, i64>(3)? as u64,
        validator: row.get(4)?,
        content_type: row.get(5)?,
    })
}

#[async_trait]
impl EntryStore for SqliteStore {
    async fn open(&self) -> Result<(), Error> {
        self.connection().await.map(|_| ())
    }

    /// Get an entry by URL.
    ///
    /// Returns None if the URL doesn't exist in the collection.
    async fn get(&self, url: &str) -> Result<Option<CacheEntry>, Error> {
        let collection = self.collection.clone();
        let url = url.to_string();
        self.connection()
            .await?
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, payload, stored_at, expires_at, size, validator, content_type
                     FROM entries WHERE collection = ?1 AND url = ?2",
                )?;

                let result = stmt.query_row(params![collection, url], |row| {
                    Ok(CacheEntry {
                        url: row.get(0)?,
                        payload: Bytes::from(row.get::<_, Vec<u8>>(1)?),
                        stored_at: row.get(2)?,
                        expires_at: row.get(3)?,
                        size: row.get::<_, i64>(4)? as u64,
                        validator: row.get(5)?,
                        content_type: row.get(6)?,
                    })
                });

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn get_metadata(&self, url: &str) -> Result<Option<EntryMetadata>, Error> {
        let collection = self.collection.clone();
        let url = url.to_string();
        self.connection()
            .await?
            .call(move |conn| -> Result<Option<EntryMetadata>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {METADATA_COLUMNS} FROM entries WHERE collection = ?1 AND url = ?2"
                ))?;

                match stmt.query_row(params![collection, url], metadata_from_row) {
                    Ok(meta) => Ok(Some(meta)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace an entry.
    ///
    /// A single UPSERT statement, so readers see either the old row or the new one.
    async fn put(&self, entry: &CacheEntry) -> Result<(), Error> {
        let collection = self.collection.clone();
        let entry = entry.clone();
        self.connection()
            .await?
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (
                        collection, url, payload, stored_at, expires_at, size, validator, content_type
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(collection, url) DO UPDATE SET
                        payload = excluded.payload,
                        stored_at = excluded.stored_at,
                        expires_at = excluded.expires_at,
                        size = excluded.size,
                        validator = excluded.validator,
                        content_type = excluded.content_type",
                    params![
                        &collection,
                        &entry.url,
                        &entry.payload[..],
                        entry.stored_at,
                        entry.expires_at,
                        entry.size as i64,
                        &entry.validator,
                        &entry.content_type,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, url: &str) -> Result<(), Error> {
        let collection = self.collection.clone();
        let url = url.to_string();
        self.connection()
            .await?
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM entries WHERE collection = ?1 AND url = ?2", params![collection, url])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn clear(&self) -> Result<(), Error> {
        let collection = self.collection.clone();
        self.connection()
            .await?
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM entries WHERE collection = ?1", params![collection])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn list_metadata(&self) -> Result<Vec<EntryMetadata>, Error> {
        let collection = self.collection.clone();
        self.connection()
            .await?
            .call(move |conn| -> Result<Vec<EntryMetadata>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {METADATA_COLUMNS} FROM entries WHERE collection = ?1 ORDER BY stored_at DESC, url ASC"
                ))?;
                let rows = stmt.query_map(params![collection], metadata_from_row)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(Error::from)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete expired entries.
    ///
    /// Returns the number of deleted entries.
    async fn purge_expired(&self, now_ms: i64) -> Result<u64, Error> {
        let collection = self.collection.clone();
        self.connection()
            .await?
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE collection = ?1 AND expires_at <= ?2",
                    params![collection, now_ms],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
