//! Unified error types for dsync.
//!
//! Display strings carry a stable upper-case code prefix so that callers
//! (and the MCP surface) can classify failures without matching on variants.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Failure of a network fetch.
///
/// Cloneable because a single in-flight fetch delivers its result to every
/// caller coalesced onto it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    /// Connection, DNS, TLS or body read failure.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The server answered with a non-success status.
    #[error("status {status}")]
    Status { status: u16 },

    /// The response body exceeded the configured byte limit.
    #[error("{size} bytes exceeds {limit}")]
    TooLarge { size: u64, limit: u64 },
}

/// Unified error types for dsync.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL key).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// URL could not be canonicalized.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Local persistence read/write failed.
    #[error("STORAGE_ERROR: {0}")]
    Storage(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORAGE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Fetch failed and no stored entry was available to fall back on.
    #[error("NETWORK_ERROR: {0}")]
    Network(#[from] NetworkError),

    /// The ingestion engine rejected the payload for missing required fields.
    #[error("SCHEMA_ERROR: missing required fields: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    /// The ingestion engine failed for a reason other than schema.
    #[error("INGEST_FAILED: {0}")]
    IngestFailed(String),
}

impl Error {
    /// Whether this error belongs to the local persistence class.
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::MigrationFailed(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Storage(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Storage(tokio_rusqlite::Error::Close(c)),
            _ => Error::Storage(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Storage(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::InvalidUrl(_) => -32003,
            Error::Storage(_) | Error::MigrationFailed(_) => -32002,
            Error::Network(_) => -32008,
            Error::Schema { .. } => -32013,
            Error::IngestFailed(_) => -32014,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
