//! Cache service: the decision engine between stored bytes, a fresh fetch,
//! and stale fallback.
//!
//! ### Load decision
//! - Valid stored entry and no forced refresh: serve it, no network call.
//! - Otherwise fetch, presenting the stored validator if there is one.
//!   - Success: overwrite the entry, serve the new bytes.
//!   - Failure with any stored entry (expired or not): serve it as stale.
//!   - Failure with nothing stored: `error` state, `NETWORK_ERROR`.
//!
//! ### Degradation
//! Store reads that fail count as "absent"; store writes that fail are logged
//! and the fetched payload is still returned.
//!
//! ### Concurrency
//! Concurrent loads of the same URL share one fetch (see [`flight`]). The
//! fetch runs on its own task, so it completes even if every caller goes away.
//! Different URLs never wait on each other.

mod flight;
pub mod status;

pub use status::{CacheState, CacheStatus, DataSource, StatusObserver};

use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::NetworkError;
use crate::fetch::{FetchOutcome, FetchRequest, Fetcher};
use crate::store::{CacheEntry, EntryMetadata, EntryStore};
use crate::Error;
use bytes::Bytes;
use flight::{Flight, FlightMap};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Result of a successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedData {
    pub payload: Bytes,
    pub from_cache: bool,
    /// Served from an entry because a refresh failed.
    pub is_stale: bool,
    pub metadata: EntryMetadata,
}

/// Aggregate figures over the service's collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CacheStats {
    pub entries: u64,
    pub total_bytes: u64,
    pub expired: u64,
}

type FlightResult = Result<LoadedData, NetworkError>;

struct Inner {
    store: Arc<dyn EntryStore>,
    fetcher: Arc<dyn Fetcher>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    status: watch::Sender<CacheStatus>,
    flights: FlightMap<FlightResult>,
}

/// Handle to the cache service.
///
/// Cloning is cheap; all clones share the store, status and in-flight fetches.
#[derive(Clone)]
pub struct CacheService {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("store", &self.inner.store)
            .field("config", &self.inner.config)
            .field("status", &*self.inner.status.borrow())
            .field("flights", &self.inner.flights)
            .finish()
    }
}

impl CacheService {
    pub fn new(store: Arc<dyn EntryStore>, fetcher: Arc<dyn Fetcher>, config: CacheConfig) -> Self {
        Self::with_clock(store, fetcher, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn EntryStore>, fetcher: Arc<dyn Fetcher>, config: CacheConfig, clock: Arc<dyn Clock>,
    ) -> Self {
        let (status, _) = watch::channel(CacheStatus::default());
        Self { inner: Arc::new(Inner { store, fetcher, config, clock, status, flights: FlightMap::new() }) }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Current time on the service's clock, in Unix milliseconds.
    pub fn now_ms(&self) -> i64 {
        self.inner.clock.now_ms()
    }

    /// Open the entry store.
    ///
    /// Returns false if persistence is unavailable; the service keeps working
    /// and every subsequent store operation degrades as usual.
    pub async fn open(&self) -> bool {
        match self.inner.store.open().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "entry store unavailable, continuing without persistence");
                false
            }
        }
    }

    /// Whether a stored entry exists for `url` and has not expired.
    pub async fn is_cache_valid(&self, url: &str) -> bool {
        let now = self.inner.clock.now_ms();
        self.get_metadata(url).await.is_some_and(|meta| meta.is_valid_at(now))
    }

    /// Stored metadata for `url`, without the payload.
    pub async fn get_metadata(&self, url: &str) -> Option<EntryMetadata> {
        match self.inner.store.get_metadata(url).await {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(url, error = %e, "metadata read failed, treating entry as absent");
                None
            }
        }
    }

    /// Load the payload for `url`.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidInput` if `url` is blank.
    /// - `Error::Network` if the fetch failed and nothing is stored for `url`.
    pub async fn load_data(&self, url: &str, force_refresh: bool) -> Result<LoadedData, Error> {
        if url.trim().is_empty() {
            return Err(Error::InvalidInput("url cannot be empty".into()));
        }

        let inner = &self.inner;
        if let Some(flight) = inner.flights.join(url) {
            tracing::debug!(url, "joining in-flight fetch");
            return Self::await_flight(flight).await;
        }

        inner.transition(|s| s.state = CacheState::Checking);

        let stored = inner.read_entry(url).await;
        let now = inner.clock.now_ms();

        if !force_refresh
            && let Some(entry) = stored.as_ref().filter(|e| e.is_valid_at(now))
        {
            tracing::debug!(url, stored_at = entry.stored_at, expires_at = entry.expires_at, "cache hit");
            inner.transition(|s| s.state = CacheState::Loading);
            return Ok(inner.deliver(entry.clone(), DataSource::Cache, false));
        }

        let worker = Arc::clone(inner);
        let key = url.to_string();
        let (flight, started) = inner.flights.join_or_start(url, move || worker.refresh(key, stored));
        if !started {
            tracing::debug!(url, "joining in-flight fetch");
        }

        Self::await_flight(flight).await
    }

    async fn await_flight(flight: Flight<FlightResult>) -> Result<LoadedData, Error> {
        match flight.await {
            Some(result) => result.map_err(Error::from),
            None => Err(NetworkError::Transport("fetch task aborted".into()).into()),
        }
    }

    /// Delete the entry for `url`. Deleting an absent entry succeeds.
    ///
    /// Does not change the status; only future validity checks are affected.
    pub async fn clear_cache(&self, url: &str) -> Result<(), Error> {
        self.inner.store.delete(url).await?;
        tracing::debug!(url, "cache entry cleared");
        Ok(())
    }

    pub async fn clear_all_cache(&self) -> Result<(), Error> {
        self.inner.store.clear().await?;
        tracing::debug!(collection = %self.inner.config.collection, "cache cleared");
        Ok(())
    }

    /// Delete expired entries, returning how many were removed.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        let deleted = self.inner.store.purge_expired(self.inner.clock.now_ms()).await?;
        tracing::debug!(deleted, "purged expired entries");
        Ok(deleted)
    }

    /// Metadata for every stored entry, most recent first.
    pub async fn list_entries(&self) -> Result<Vec<EntryMetadata>, Error> {
        self.inner.store.list_metadata().await
    }

    pub async fn stats(&self) -> Result<CacheStats, Error> {
        let now = self.inner.clock.now_ms();
        let entries = self.inner.store.list_metadata().await?;
        Ok(entries.iter().fold(CacheStats::default(), |mut stats, meta| {
            stats.entries += 1;
            stats.total_bytes += meta.size;
            if !meta.is_valid_at(now) {
                stats.expired += 1;
            }
            stats
        }))
    }

    /// Snapshot of the current status.
    pub fn get_status(&self) -> CacheStatus {
        self.inner.status.borrow().clone()
    }

    pub fn subscribe(&self) -> StatusObserver {
        StatusObserver::new(self.inner.status.subscribe())
    }
}

impl Inner {
    fn transition(&self, update: impl FnOnce(&mut CacheStatus)) {
        self.status.send_modify(update);
        tracing::debug!(state = ?self.status.borrow().state, "cache status transition");
    }

    async fn read_entry(&self, url: &str) -> Option<CacheEntry> {
        match self.store.get(url).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(url, error = %e, "entry read failed, treating entry as absent");
                None
            }
        }
    }

    async fn write_entry(&self, entry: &CacheEntry) {
        if let Err(e) = self.store.put(entry).await {
            tracing::warn!(url = %entry.url, size = entry.size, error = %e, "entry write failed, serving without persisting");
        }
    }

    /// Timestamp for a write that replaces `previous`, strictly after it.
    fn next_stored_at(&self, previous: Option<&CacheEntry>) -> i64 {
        let now = self.clock.now_ms();
        match previous {
            Some(prev) => now.max(prev.stored_at.saturating_add(1)),
            None => now,
        }
    }

    fn deliver(&self, entry: CacheEntry, source: DataSource, is_stale: bool) -> LoadedData {
        self.transition(|s| s.delivered(source, entry.stored_at, is_stale));
        LoadedData {
            metadata: entry.metadata(),
            payload: entry.payload,
            from_cache: source == DataSource::Cache,
            is_stale,
        }
    }

    async fn refresh(self: Arc<Self>, url: String, previous: Option<CacheEntry>) -> FlightResult {
        self.transition(|s| s.state = CacheState::Loading);

        let request = FetchRequest { url: url.clone(), validator: previous.as_ref().and_then(|e| e.validator.clone()) };
        let start = Instant::now();
        let outcome = self.fetcher.fetch(&request).await;
        let fetch_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(FetchOutcome::Fetched(fetched)) => {
                let entry = CacheEntry::new(url, fetched.payload, self.next_stored_at(previous.as_ref()), self.config.ttl_ms())
                    .with_validator(fetched.validator)
                    .with_content_type(fetched.content_type);
                tracing::debug!(url = %entry.url, size = entry.size, fetch_ms, "fetched from network");
                self.write_entry(&entry).await;
                Ok(self.deliver(entry, DataSource::Network, false))
            }
            Ok(FetchOutcome::NotModified { validator }) => match previous {
                Some(prev) => {
                    let stored_at = self.next_stored_at(Some(&prev));
                    let entry = CacheEntry::new(url, prev.payload, stored_at, self.config.ttl_ms())
                        .with_validator(validator.or(prev.validator))
                        .with_content_type(prev.content_type);
                    tracing::debug!(url = %entry.url, fetch_ms, "revalidated, payload unchanged");
                    self.write_entry(&entry).await;
                    Ok(self.deliver(entry, DataSource::Network, false))
                }
                None => self.fall_back(&url, None, NetworkError::Status { status: 304 }),
            },
            Err(err) => self.fall_back(&url, previous, err),
        }
    }

    fn fall_back(&self, url: &str, previous: Option<CacheEntry>, err: NetworkError) -> FlightResult {
        match previous {
            Some(entry) => {
                tracing::warn!(url, stored_at = entry.stored_at, error = %err, "fetch failed, serving stale entry");
                Ok(self.deliver(entry, DataSource::Cache, true))
            }
            None => {
                tracing::warn!(url, error = %err, "fetch failed with no stored entry");
                let message = Error::Network(err.clone()).to_string();
                self.transition(|s| {
                    s.state = CacheState::Error;
                    s.last_error = Some(message);
                });
                Err(err)
            }
        }
    }
}
