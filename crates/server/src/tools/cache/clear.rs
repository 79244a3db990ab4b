//! cache_clear tool implementation.

use crate::tools::json_result;
use dsync_client::canonicalize;
use dsync_core::{CacheService, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_clear tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearParams {
    /// Entry to delete. Omit to clear the whole collection.
    #[serde(default)]
    pub url: Option<String>,
}

/// Output from the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearOutput {
    /// The URL cleared, or "*" for the whole collection.
    pub cleared: String,
}

/// Implementation of the cache_clear tool.
pub async fn clear_impl(cache: &CacheService, params: CacheClearParams) -> Result<CallToolResult, McpError> {
    let cleared = match params.url {
        Some(url) => {
            let url = canonicalize(&url).map_err(Error::from)?;
            cache.clear_cache(url.as_str()).await?;
            url.to_string()
        }
        None => {
            cache.clear_all_cache().await?;
            "*".to_string()
        }
    };

    json_result(&CacheClearOutput { cleared })
}
