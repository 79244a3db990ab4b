//! HTTP fetch capability for the cache service.
//!
//! ### Request
//! - Plain GET; `If-None-Match` carries the stored validator when present
//! - Max redirects: 5
//!
//! ### Response classification
//! - 2xx: body streamed up to `max_bytes`, `ETag` kept as the new validator
//! - 304: the stored payload is still current
//! - anything else: `NetworkError::Status`
//! - timeouts and transport failures: `NetworkError::Timeout` / `Transport`

pub mod url;

use async_trait::async_trait;
use bytes::BytesMut;
use reqwest::{Client, StatusCode, header};
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize};

use dsync_core::{AppConfig, Error, FetchOutcome, FetchRequest, FetchedPayload, Fetcher, NetworkError};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "dsync/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 256MB)
    pub max_bytes: u64,

    /// Request timeout (default: 60s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Honor HTTP(S)_PROXY environment variables (default: true)
    pub use_env_proxy: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "dsync/0.1".to_string(),
            max_bytes: 256 * 1024 * 1024,
            timeout: Duration::from_millis(60_000),
            max_redirects: 5,
            use_env_proxy: true,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

fn classify(err: reqwest::Error) -> NetworkError {
    if err.is_timeout() { NetworkError::Timeout(err.to_string()) } else { NetworkError::Transport(err.to_string()) }
}

fn header_string(headers: &header::HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// HTTP fetcher backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let mut builder = Client::builder();
        if !config.use_env_proxy {
            builder = builder.no_proxy();
        }

        let http = builder
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::InvalidInput(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn too_large(&self, size: u64) -> NetworkError {
        NetworkError::TooLarge { size, limit: self.config.max_bytes }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchOutcome, NetworkError> {
        let start = Instant::now();

        let mut builder = self.http.get(request.url.as_str());
        if let Some(validator) = &request.validator {
            builder = builder.header(header::IF_NONE_MATCH, validator.as_str());
        }

        let mut response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let headers = response.headers().clone();

        if status == StatusCode::NOT_MODIFIED {
            tracing::debug!(url = %request.url, "not modified");
            return Ok(FetchOutcome::NotModified { validator: header_string(&headers, header::ETAG) });
        }

        if !status.is_success() {
            return Err(NetworkError::Status { status: status.as_u16() });
        }

        if let Some(len) = response.content_length()
            && len > self.config.max_bytes
        {
            return Err(self.too_large(len));
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(classify)? {
            let size = (body.len() + chunk.len()) as u64;
            if size > self.config.max_bytes {
                return Err(self.too_large(size));
            }
            body.extend_from_slice(&chunk);
        }

        let fetch_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            url = %request.url,
            final_url = %response.url(),
            fetch_ms,
            size = body.len(),
            "fetched"
        );

        Ok(FetchOutcome::Fetched(FetchedPayload {
            payload: body.freeze(),
            validator: header_string(&headers, header::ETAG),
            content_type: header_string(&headers, header::CONTENT_TYPE),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer exactly one request with `response`, returning the raw request head.
    async fn serve_once(response: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/orders.parquet", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&head).to_lowercase()
        });
        (url, handle)
    }

    fn local_fetcher(max_bytes: u64) -> HttpFetcher {
        HttpFetcher::new(FetchConfig { max_bytes, use_env_proxy: false, ..Default::default() }).unwrap()
    }

    fn request(url: &str, validator: Option<&str>) -> FetchRequest {
        FetchRequest { url: url.to_string(), validator: validator.map(str::to_string) }
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "dsync/0.1");
        assert_eq!(config.max_bytes, 256 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(60_000));
        assert_eq!(config.max_redirects, 5);
        assert!(config.use_env_proxy);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "custom/1.0".into(), max_bytes: 1024, timeout_ms: 500, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "custom/1.0");
        assert_eq!(config.max_bytes, 1024);
        assert_eq!(config.timeout, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_fetch_success_captures_validator() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/vnd.apache.parquet\r\nETag: \"v1\"\r\nContent-Length: 4\r\nConnection: close\r\n\r\nPAR1",
        )
        .await;
        let fetcher = local_fetcher(1024);

        let outcome = fetcher.fetch(&request(&url, None)).await.unwrap();
        let FetchOutcome::Fetched(fetched) = outcome else { panic!("expected a body") };
        assert_eq!(&fetched.payload[..], b"PAR1");
        assert_eq!(fetched.validator.as_deref(), Some("\"v1\""));
        assert_eq!(fetched.content_type.as_deref(), Some("application/vnd.apache.parquet"));

        let head = server.await.unwrap();
        assert!(head.starts_with("get /orders.parquet"));
        assert!(!head.contains("if-none-match"));
    }

    #[tokio::test]
    async fn test_fetch_sends_validator_and_handles_not_modified() {
        let (url, server) =
            serve_once("HTTP/1.1 304 Not Modified\r\nETag: \"v1\"\r\nConnection: close\r\n\r\n").await;
        let fetcher = local_fetcher(1024);

        let outcome = fetcher.fetch(&request(&url, Some("\"v1\""))).await.unwrap();
        assert_eq!(outcome, FetchOutcome::NotModified { validator: Some("\"v1\"".into()) });

        let head = server.await.unwrap();
        assert!(head.contains("if-none-match: \"v1\""));
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let (url, _server) =
            serve_once("HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;
        let fetcher = local_fetcher(1024);

        let result = fetcher.fetch(&request(&url, None)).await;
        assert_eq!(result, Err(NetworkError::Status { status: 503 }));
    }

    #[tokio::test]
    async fn test_fetch_rejects_declared_oversize_body() {
        let (url, _server) =
            serve_once("HTTP/1.1 200 OK\r\nContent-Length: 10\r\nConnection: close\r\n\r\n0123456789").await;
        let fetcher = local_fetcher(4);

        let result = fetcher.fetch(&request(&url, None)).await;
        assert_eq!(result, Err(NetworkError::TooLarge { size: 10, limit: 4 }));
    }

    #[tokio::test]
    async fn test_fetch_rejects_streamed_oversize_body() {
        let (url, _server) = serve_once("HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n0123456789").await;
        let fetcher = local_fetcher(4);

        let result = fetcher.fetch(&request(&url, None)).await;
        assert!(matches!(result, Err(NetworkError::TooLarge { limit: 4, .. })));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = local_fetcher(1024);
        let result = fetcher.fetch(&request(&format!("http://{addr}/orders.parquet"), None)).await;
        assert!(matches!(result, Err(NetworkError::Transport(_))));
    }

    #[tokio::test]
    async fn test_fetcher_new() {
        let fetcher = HttpFetcher::new(FetchConfig::default());
        assert!(fetcher.is_ok());
    }
}
