//! dsync server entry point.
//!
//! Boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::Result;
use dsync_client::{FetchConfig, HttpFetcher};
use dsync_core::{AppConfig, CacheService, Loader, SqliteStore};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod ingest;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        db_path = %config.db_path().display(),
        collection = %config.collection,
        ttl_ms = config.ttl_ms,
        "Starting dsync server on stdio transport"
    );

    let store = Arc::new(SqliteStore::new(config.db_path(), config.collection.clone()));
    let fetcher = Arc::new(HttpFetcher::new(FetchConfig::from(&config))?);
    let cache = CacheService::new(store, fetcher, config.cache_config());
    cache.open().await;

    let ingestor = Arc::new(ingest::SpoolIngestor::new(config.spool_dir.clone()));
    let loader = Loader::new(cache, ingestor);

    let handler = handler::DsyncServer::new(Arc::new(config), loader);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
