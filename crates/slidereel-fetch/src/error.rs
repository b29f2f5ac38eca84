//! Fetch error types.

use thiserror::Error;

/// Result type for image resolution.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors from resolving a slide image reference.
///
/// Security rejections and network failures share one enum; none of them are
/// retried.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid image source: {0}")]
    InvalidSource(String),

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Blocked URL scheme: {0}")]
    BlockedScheme(String),

    #[error("Blocked host: {0}")]
    BlockedHost(String),

    #[error("DNS resolution failed for {0}")]
    DnsFailed(String),

    #[error("Too many redirects (limit {0})")]
    TooManyRedirects(u32),

    #[error("Redirect response missing Location header")]
    RedirectMissingLocation,

    #[error("Upstream returned status {0}")]
    BadStatus(reqwest::StatusCode),

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Image too large (limit {0} bytes)")]
    TooLarge(u64),

    #[error("Image fetch timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    pub fn invalid_source(msg: impl Into<String>) -> Self {
        Self::InvalidSource(msg.into())
    }

    pub fn blocked_host(msg: impl Into<String>) -> Self {
        Self::BlockedHost(msg.into())
    }

    /// True when the failure is a policy rejection rather than a transport
    /// problem.
    pub fn is_security_rejection(&self) -> bool {
        matches!(
            self,
            FetchError::InvalidSource(_)
                | FetchError::BlockedScheme(_)
                | FetchError::BlockedHost(_)
                | FetchError::TooManyRedirects(_)
                | FetchError::UnsupportedContentType(_)
                | FetchError::TooLarge(_)
        )
    }
}
