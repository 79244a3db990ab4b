//! Loader: obtains a payload through the cache service and hands it to the
//! ingestion engine.
//!
//! The payload is passed through unmodified. Schema checks belong to the
//! ingestion engine; a report of missing fields becomes `Error::Schema`.

use crate::Error;
use crate::service::CacheService;
use crate::store::EntryMetadata;
use async_trait::async_trait;
use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Ingested,
    /// The payload lacks required fields; nothing was ingested.
    MissingFields(Vec<String>),
}

/// External engine that consumes dataset payloads.
#[async_trait]
pub trait Ingestor: Send + Sync + std::fmt::Debug {
    async fn ingest(&self, url: &str, payload: Bytes) -> Result<IngestOutcome, Error>;
}

/// Summary of a completed load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LoadReport {
    pub url: String,
    pub from_cache: bool,
    pub is_stale: bool,
    pub metadata: EntryMetadata,
}

#[derive(Debug, Clone)]
pub struct Loader {
    cache: CacheService,
    ingestor: Arc<dyn Ingestor>,
}

impl Loader {
    pub fn new(cache: CacheService, ingestor: Arc<dyn Ingestor>) -> Self {
        Self { cache, ingestor }
    }

    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    /// Load `url` and ingest it.
    ///
    /// # Errors
    ///
    /// - Whatever `CacheService::load_data` returns (no usable payload).
    /// - `Error::Schema` when the ingestion engine reports missing fields.
    /// - Any error raised by the ingestion engine itself.
    pub async fn load(&self, url: &str, force_refresh: bool) -> Result<LoadReport, Error> {
        let loaded = self.cache.load_data(url, force_refresh).await?;

        match self.ingestor.ingest(url, loaded.payload).await? {
            IngestOutcome::Ingested => {
                tracing::info!(
                    url,
                    size = loaded.metadata.size,
                    from_cache = loaded.from_cache,
                    is_stale = loaded.is_stale,
                    "dataset ingested"
                );
                Ok(LoadReport {
                    url: url.to_string(),
                    from_cache: loaded.from_cache,
                    is_stale: loaded.is_stale,
                    metadata: loaded.metadata,
                })
            }
            IngestOutcome::MissingFields(missing) => {
                tracing::warn!(url, missing = ?missing, "ingestion rejected payload");
                Err(Error::Schema { missing })
            }
        }
    }
}
