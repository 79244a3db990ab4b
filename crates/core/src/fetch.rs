//! Network fetch capability injected into the cache service.
//!
//! The HTTP implementation lives in `dsync-client`; tests script their own.

use crate::error::NetworkError;
use async_trait::async_trait;
use bytes::Bytes;

/// A GET of `url`, optionally conditional on a previously stored validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub validator: Option<String>,
}

/// A full response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPayload {
    pub payload: Bytes,
    pub validator: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched(FetchedPayload),
    /// The origin confirmed the stored payload is current.
    NotModified { validator: Option<String> },
}

#[async_trait]
pub trait Fetcher: Send + Sync + std::fmt::Debug {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchOutcome, NetworkError>;
}
