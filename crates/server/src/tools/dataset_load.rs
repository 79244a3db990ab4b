//! dataset_load tool implementation.
//!
//! Loads a dataset through the cache and hands it to the ingestion engine.

use crate::error::ServerError;
use crate::tools::json_result;
use dsync_client::canonicalize;
use dsync_core::{AppConfig, Error, Loader};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the dataset_load tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DatasetLoadParams {
    /// Dataset URL. Defaults to the configured dataset_url.
    #[serde(default)]
    pub url: Option<String>,

    /// Skip the validity check and always attempt a network fetch.
    #[serde(default)]
    pub force_refresh: bool,
}

/// Implementation of the dataset_load tool.
pub async fn load_impl(
    config: &AppConfig, loader: &Loader, params: DatasetLoadParams,
) -> Result<CallToolResult, McpError> {
    let requested = config.resolve_dataset_url(params.url.as_deref()).map_err(ServerError::from)?;
    let url = canonicalize(requested).map_err(Error::from)?;

    let report = loader.load(url.as_str(), params.force_refresh).await?;
    json_result(&report)
}
