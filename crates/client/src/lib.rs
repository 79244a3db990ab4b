//! HTTP client for dsync.
//!
//! Provides the reqwest-backed [`Fetcher`](dsync_core::Fetcher) used by the
//! cache service, plus URL canonicalization for cache keys.

pub mod fetch;

pub use fetch::{FetchConfig, HttpFetcher, UrlError, canonicalize};
