//! MCP tool implementations.
//!
//! Each tool has a `*_impl` function taking the service it drives, so it can
//! be exercised without an MCP transport.

pub mod cache;
pub mod dataset_load;

pub use dataset_load::{DatasetLoadParams, load_impl};

use dsync_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Serialize `output` as the pretty-printed text content of a successful result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
