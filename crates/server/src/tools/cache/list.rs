//! cache_list tool implementation.

use crate::tools::json_result;
use dsync_core::{CacheService, CacheStats, EntryMetadata};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    /// Stored entries, most recent first.
    pub entries: Vec<EntryMetadata>,
    pub stats: CacheStats,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(cache: &CacheService) -> Result<CallToolResult, McpError> {
    let entries = cache.list_entries().await?;
    let stats = cache.stats().await?;
    json_result(&CacheListOutput { entries, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing;
    use dsync_core::ManualClock;

    #[tokio::test]
    async fn test_list_entries_and_stats() {
        let clock = ManualClock::new(0);
        let cache = testing::cache(Some(&b"abc"[..]), clock.clone());
        cache.load_data("https://data.example.com/a.csv", false).await.unwrap();
        clock.advance(10);
        cache.load_data("https://data.example.com/b.csv", false).await.unwrap();

        let output: CacheListOutput = testing::parse(&list_impl(&cache).await.unwrap());
        let urls: Vec<_> = output.entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, ["https://data.example.com/b.csv", "https://data.example.com/a.csv"]);
        assert_eq!(output.stats, CacheStats { entries: 2, total_bytes: 6, expired: 0 });
    }
}
