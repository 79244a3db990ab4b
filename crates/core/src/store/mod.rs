//! Durable key-value persistence for dataset payloads.
//!
//! Entries are keyed by resource URL and always written as a whole: a put
//! replaces every field of the previous entry. Two backends are provided:
//!
//! - [`SqliteStore`]: SQLite via tokio-rusqlite, survives restarts
//! - [`MemoryStore`]: process-local map, for tests and ephemeral use

pub mod connection;
pub mod entries;
pub mod memory;
pub mod migrations;

use async_trait::async_trait;
use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use crate::Error;

pub use connection::SqliteStore;
pub use memory::MemoryStore;

/// A stored payload plus its freshness metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub url: String,
    pub payload: Bytes,
    /// Unix milliseconds of the write that produced this entry.
    pub stored_at: i64,
    /// Unix milliseconds after which the entry is expired. Always `> stored_at`.
    pub expires_at: i64,
    pub size: u64,
    /// Revalidation token (e.g. ETag) supplied by the origin.
    pub validator: Option<String>,
    pub content_type: Option<String>,
}

impl CacheEntry {
    /// Build an entry stamped at `stored_at` that expires `ttl_ms` later.
    ///
    /// A non-positive TTL is clamped to 1ms.
    pub fn new(url: impl Into<String>, payload: Bytes, stored_at: i64, ttl_ms: i64) -> Self {
        let size = payload.len() as u64;
        Self {
            url: url.into(),
            payload,
            stored_at,
            expires_at: stored_at.saturating_add(ttl_ms.max(1)),
            size,
            validator: None,
            content_type: None,
        }
    }

    pub fn with_validator(mut self, validator: Option<String>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_content_type(mut self, content_type: Option<String>) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at
    }

    pub fn metadata(&self) -> EntryMetadata {
        EntryMetadata {
            url: self.url.clone(),
            stored_at: self.stored_at,
            expires_at: self.expires_at,
            size: self.size,
            validator: self.validator.clone(),
            content_type: self.content_type.clone(),
        }
    }
}

/// Entry metadata without the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EntryMetadata {
    pub url: String,
    pub stored_at: i64,
    pub expires_at: i64,
    pub size: u64,
    pub validator: Option<String>,
    pub content_type: Option<String>,
}

impl EntryMetadata {
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at
    }
}

/// Persistent key-value store for [`CacheEntry`] records.
///
/// Every error returned here is a storage-class error (see
/// [`Error::is_storage`]); callers decide whether to degrade or propagate.
#[async_trait]
pub trait EntryStore: Send + Sync + std::fmt::Debug {
    /// Establish the underlying connection. Safe to call repeatedly.
    async fn open(&self) -> Result<(), Error>;

    async fn get(&self, url: &str) -> Result<Option<CacheEntry>, Error>;

    /// Metadata only; the payload is not read.
    async fn get_metadata(&self, url: &str) -> Result<Option<EntryMetadata>, Error>;

    /// Replace the entry for `entry.url` atomically.
    async fn put(&self, entry: &CacheEntry) -> Result<(), Error>;

    /// Remove the entry if present. Deleting an absent key succeeds.
    async fn delete(&self, url: &str) -> Result<(), Error>;

    async fn clear(&self) -> Result<(), Error>;

    /// Metadata for every entry, most recently stored first.
    async fn list_metadata(&self) -> Result<Vec<EntryMetadata>, Error>;

    /// Delete entries with `expires_at <= now_ms`, returning how many were removed.
    async fn purge_expired(&self, now_ms: i64) -> Result<u64, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_invariants() {
        let entry = CacheEntry::new("https://example.com/orders.parquet", Bytes::from_static(b"PAR1"), 1_000, 500);
        assert_eq!(entry.size, 4);
        assert_eq!(entry.expires_at, 1_500);
        assert!(entry.expires_at > entry.stored_at);
    }

    #[test]
    fn test_entry_zero_ttl_clamped() {
        let entry = CacheEntry::new("u", Bytes::new(), 10, 0);
        assert_eq!(entry.expires_at, 11);
    }

    #[test]
    fn test_entry_validity_boundary() {
        let entry = CacheEntry::new("u", Bytes::new(), 0, 1000);
        assert!(entry.is_valid_at(999));
        assert!(!entry.is_valid_at(1000));
        assert!(entry.metadata().is_valid_at(999));
        assert!(!entry.metadata().is_valid_at(1000));
    }

    #[test]
    fn test_metadata_projection() {
        let entry = CacheEntry::new("u", Bytes::from_static(b"abc"), 0, 10)
            .with_validator(Some("\"v1\"".into()))
            .with_content_type(Some("application/vnd.apache.parquet".into()));
        let meta = entry.metadata();
        assert_eq!(meta.size, 3);
        assert_eq!(meta.validator.as_deref(), Some("\"v1\""));
        assert_eq!(meta.content_type.as_deref(), Some("application/vnd.apache.parquet"));
    }
}
