//! cache_meta tool implementation.
//!
//! Reports stored metadata for one URL without reading the payload.

use crate::error::ServerError;
use crate::tools::json_result;
use dsync_client::canonicalize;
use dsync_core::{CacheService, EntryMetadata, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_meta tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMetaParams {
    /// Dataset URL to look up.
    pub url: String,
}

/// Output from the cache_meta tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMetaOutput {
    #[serde(flatten)]
    pub metadata: EntryMetadata,

    /// Whether the entry is still within its TTL.
    pub valid: bool,
}

/// Implementation of the cache_meta tool.
pub async fn meta_impl(cache: &CacheService, params: CacheMetaParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url).map_err(Error::from)?;
    let metadata = cache
        .get_metadata(url.as_str())
        .await
        .ok_or_else(|| ServerError::CacheMiss(url.to_string()))?;

    let valid = metadata.is_valid_at(cache.now_ms());
    json_result(&CacheMetaOutput { metadata, valid })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing;
    use dsync_core::ManualClock;
    use rmcp::model::ErrorCode;

    const URL: &str = "https://data.example.com/a.csv";

    #[tokio::test]
    async fn test_meta_missing() {
        let cache = testing::cache(None, ManualClock::new(0));
        let err = meta_impl(&cache, CacheMetaParams { url: URL.into() }).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32602));
        assert!(err.message.starts_with("CACHE_MISS"));
    }

    #[tokio::test]
    async fn test_meta_validity_tracks_clock() {
        let clock = ManualClock::new(0);
        let cache = testing::cache(Some(&b"a,b\n"[..]), clock.clone());
        cache.load_data(URL, false).await.unwrap();

        let output: CacheMetaOutput =
            testing::parse(&meta_impl(&cache, CacheMetaParams { url: URL.into() }).await.unwrap());
        assert_eq!(output.metadata.url, URL);
        assert_eq!(output.metadata.size, 4);
        assert_eq!(output.metadata.expires_at, cache.config().ttl_ms());
        assert!(output.valid);

        clock.set(cache.config().ttl_ms());
        let output: CacheMetaOutput =
            testing::parse(&meta_impl(&cache, CacheMetaParams { url: format!("{URL}#x") }).await.unwrap());
        assert!(!output.valid);
    }
}
