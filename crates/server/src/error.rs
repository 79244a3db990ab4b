//! Server-level errors that have no counterpart in `dsync_core::Error`.

use dsync_core::ConfigError;
use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Request could not be resolved against the configuration.
    #[error("INVALID_INPUT: {0}")]
    Config(#[from] ConfigError),

    /// No stored entry for the requested URL.
    #[error("CACHE_MISS: no entry for {0}")]
    CacheMiss(String),
}

impl From<ServerError> for McpError {
    fn from(err: ServerError) -> Self {
        McpError { code: ErrorCode(-32602), message: err.to_string().into(), data: None }
    }
}
