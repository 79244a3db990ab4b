//! Dataset URL canonicalization.
//!
//! The canonical string is the cache key, so two spellings of the same
//! resource must collapse to one entry.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("URL must be absolute: {0}")]
    NotAbsolute(String),

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("credentials are not allowed in dataset URLs")]
    Credentials,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for dsync_core::Error {
    fn from(err: UrlError) -> Self {
        dsync_core::Error::InvalidUrl(err.to_string())
    }
}

/// Canonicalize a dataset URL.
///
/// 1. Trim surrounding whitespace
/// 2. Require an absolute http(s) URL
/// 3. Reject embedded credentials (they would end up in the store key)
/// 4. Lowercase scheme and host, drop default ports (done by the parser)
/// 5. Remove the fragment; the query string is kept as given
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = match url::Url::parse(trimmed) {
        Ok(parsed) => parsed,
        Err(url::ParseError::RelativeUrlWithoutBase) => return Err(UrlError::NotAbsolute(trimmed.to_string())),
        Err(e) => return Err(UrlError::InvalidUrl(e.to_string())),
    };

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if !parsed.username().is_empty() || parsed.password().is_some() {
        return Err(UrlError::Credentials);
    }

    parsed.set_fragment(None);
    Ok(parsed)
}
