//! Core types and shared functionality for dsync.
//!
//! This crate provides:
//! - Entry store with SQLite and in-memory backends
//! - Cache service (validity, fetch, stale fallback, status)
//! - Loader bridging the cache to an ingestion engine
//! - Unified error types
//! - Configuration structures

pub mod clock;
pub mod config;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod service;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, CacheConfig, ConfigError};
pub use error::{Error, NetworkError};
pub use fetch::{FetchOutcome, FetchRequest, FetchedPayload, Fetcher};
pub use loader::{IngestOutcome, Ingestor, LoadReport, Loader};
pub use service::{CacheService, CacheState, CacheStats, CacheStatus, DataSource, LoadedData, StatusObserver};
pub use store::{CacheEntry, EntryMetadata, EntryStore, MemoryStore, SqliteStore};
