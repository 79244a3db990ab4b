//! cache_purge tool implementation.
//!
//! Deletes entries whose TTL has elapsed.

use crate::tools::json_result;
use dsync_core::CacheService;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(cache: &CacheService) -> Result<CallToolResult, McpError> {
    let deleted = cache.purge_expired().await?;
    json_result(&CachePurgeOutput { deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing;
    use dsync_core::ManualClock;

    #[tokio::test]
    async fn test_purge_expired_only() {
        let clock = ManualClock::new(0);
        let cache = testing::cache(Some(&b"x"[..]), clock.clone());
        cache.load_data("https://data.example.com/old.csv", false).await.unwrap();

        clock.set(cache.config().ttl_ms());
        cache.load_data("https://data.example.com/new.csv", false).await.unwrap();

        let output: CachePurgeOutput = testing::parse(&purge_impl(&cache).await.unwrap());
        assert_eq!(output.deleted, 1);

        let remaining = cache.list_entries().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].url, "https://data.example.com/new.csv");
    }

    #[tokio::test]
    async fn test_purge_empty() {
        let cache = testing::cache(None, ManualClock::new(0));
        let output: CachePurgeOutput = testing::parse(&purge_impl(&cache).await.unwrap());
        assert_eq!(output.deleted, 0);
    }
}
