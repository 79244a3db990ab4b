//! In-memory entry store.
//!
//! Uses a HashMap behind a tokio RwLock. Nothing survives the process.

use super::{CacheEntry, EntryMetadata, EntryStore};
use crate::Error;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn open(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn get(&self, url: &str) -> Result<Option<CacheEntry>, Error> {
        Ok(self.entries.read().await.get(url).cloned())
    }

    async fn get_metadata(&self, url: &str) -> Result<Option<EntryMetadata>, Error> {
        Ok(self.entries.read().await.get(url).map(CacheEntry::metadata))
    }

    async fn put(&self, entry: &CacheEntry) -> Result<(), Error> {
        self.entries.write().await.insert(entry.url.clone(), entry.clone());
        Ok(())
    }

    async fn delete(&self, url: &str) -> Result<(), Error> {
        self.entries.write().await.remove(url);
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn list_metadata(&self) -> Result<Vec<EntryMetadata>, Error> {
        let mut listed: Vec<_> = self.entries.read().await.values().map(CacheEntry::metadata).collect();
        listed.sort_by(|a, b| b.stored_at.cmp(&a.stored_at).then_with(|| a.url.cmp(&b.url)));
        Ok(listed)
    }

    async fn purge_expired(&self, now_ms: i64) -> Result<u64, Error> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now_ms);
        Ok((before - entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_round_trip_and_delete() {
        let store = MemoryStore::new();
        store.open().await.unwrap();
        let entry = CacheEntry::new("u", Bytes::from_static(b"data"), 0, 100);

        store.put(&entry).await.unwrap();
        assert_eq!(store.get("u").await.unwrap(), Some(entry.clone()));
        assert_eq!(store.get_metadata("u").await.unwrap(), Some(entry.metadata()));

        store.delete("u").await.unwrap();
        store.delete("u").await.unwrap();
        assert!(store.get("u").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_and_list() {
        let store = MemoryStore::new();
        store.put(&CacheEntry::new("a", Bytes::new(), 0, 10)).await.unwrap();
        store.put(&CacheEntry::new("b", Bytes::new(), 50, 10)).await.unwrap();

        assert_eq!(store.list_metadata().await.unwrap()[0].url, "b");
        assert_eq!(store.purge_expired(10).await.unwrap(), 1);
        assert_eq!(store.list_metadata().await.unwrap().len(), 1);

        store.clear().await.unwrap();
        assert!(store.list_metadata().await.unwrap().is_empty());
    }
}
