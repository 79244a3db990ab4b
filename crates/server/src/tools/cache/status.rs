//! cache_status tool implementation.

use crate::tools::json_result;
use dsync_core::CacheService;
use rmcp::{ErrorData as McpError, model::CallToolResult};

/// Current status snapshot of the cache service.
pub fn status_impl(cache: &CacheService) -> Result<CallToolResult, McpError> {
    json_result(&cache.get_status())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing;
    use dsync_core::{CacheState, CacheStatus, DataSource, ManualClock};

    #[tokio::test]
    async fn test_status_follows_loads() {
        let cache = testing::cache(Some(&b"a,b\n"[..]), ManualClock::new(5_000));

        let status: CacheStatus = testing::parse(&status_impl(&cache).unwrap());
        assert_eq!(status.state, CacheState::Idle);
        assert_eq!(status.source, None);

        cache.load_data("https://data.example.com/a.csv", false).await.unwrap();
        let status: CacheStatus = testing::parse(&status_impl(&cache).unwrap());
        assert_eq!(status.state, CacheState::Ready);
        assert_eq!(status.source, Some(DataSource::Network));
        assert_eq!(status.last_timestamp, Some(5_000));
        assert!(!status.is_stale);
    }

    #[tokio::test]
    async fn test_status_reports_error() {
        let cache = testing::cache(None, ManualClock::new(0));
        assert!(cache.load_data("https://data.example.com/a.csv", false).await.is_err());

        let status: CacheStatus = testing::parse(&status_impl(&cache).unwrap());
        assert_eq!(status.state, CacheState::Error);
        assert!(status.last_error.unwrap().starts_with("NETWORK_ERROR"));
    }
}
