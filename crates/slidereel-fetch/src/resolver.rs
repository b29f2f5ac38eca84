//! Slide image resolution.
//!
//! Turns a slide's image reference into a local file the encoder can read.
//! Asset-store references short-circuit to the stored file; anything else is
//! downloaded with the SSRF guard, a manual redirect budget, a content-type
//! allowlist, and a hard byte cap.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{pin_mut, Stream, StreamExt};
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use tracing::{debug, info};
use url::Url;

use slidereel_models::{extension_for_mime, AssetId};
use slidereel_store::AssetStore;

use crate::error::{FetchError, FetchResult};
use crate::ssrf::guard_url;

/// Default per-image fetch timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Default downloaded image size cap.
pub const DEFAULT_MAX_BYTES: u64 = 12 * 1024 * 1024;

/// Default redirect hop budget.
pub const DEFAULT_MAX_REDIRECTS: u32 = 1;

/// Image fetch configuration.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Overall timeout for one image fetch (all hops included)
    pub timeout: Duration,
    /// Maximum accepted body size in bytes
    pub max_bytes: u64,
    /// Maximum redirect hops before giving up
    pub max_redirects: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_bytes: DEFAULT_MAX_BYTES,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl FetchConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            timeout: Duration::from_secs(
                std::env::var("FETCH_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            max_bytes: std::env::var("FETCH_MAX_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_BYTES),
            max_redirects: std::env::var("FETCH_MAX_REDIRECTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_REDIRECTS),
        }
    }
}

/// One slide's image reference plus where the resolved file should land.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    /// `/api/...` path or absolute http(s) URL
    pub image_src: Option<String>,
    /// Asset store reference, takes precedence over `image_src`
    pub asset_id: Option<String>,
    /// Requesting user, checked against asset ownership
    pub owner_id: Option<String>,
    /// Trusted internal origin that `/api/` paths join onto
    pub base_url: Option<String>,
    /// Slide position, used in the output file name
    pub slide_index: usize,
    /// Directory the downloaded file is written into
    pub dest_dir: PathBuf,
}

/// Resolves slide image references to local files.
///
/// The underlying client never follows redirects on its own; hops are walked
/// manually so every target can be re-validated.
pub struct ImageFetcher {
    http: Client,
    store: Arc<AssetStore>,
    config: FetchConfig,
}

impl ImageFetcher {
    /// Create a new fetcher sharing the given asset store.
    pub fn new(store: Arc<AssetStore>, config: FetchConfig) -> FetchResult<Self> {
        let http = Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(FetchError::Network)?;

        Ok(Self {
            http,
            store,
            config,
        })
    }

    /// Resolve one slide's image to a local path.
    ///
    /// Asset hits return the stored file directly; downloads are written to
    /// `slide-<index>.<ext>` in the request's destination directory.
    pub async fn resolve(&self, request: &ResolveRequest) -> FetchResult<PathBuf> {
        if let Some(id) = &request.asset_id {
            // A URL pasted into the assetId field is not a store reference.
            if !looks_like_url(id) {
                let asset_id = AssetId::from_string(id.clone());
                if let Some(asset) = self
                    .store
                    .get(&asset_id, request.owner_id.as_deref())
                    .await
                {
                    debug!(
                        slide = request.slide_index,
                        asset_id = %asset_id,
                        "Resolved slide image from asset store"
                    );
                    return Ok(asset.path);
                }

                if request.image_src.is_none() {
                    return Err(FetchError::AssetNotFound(id.clone()));
                }
            }
        }

        let src = request.image_src.as_deref().ok_or_else(|| {
            FetchError::invalid_source("slide has neither a usable assetId nor an imageSrc")
        })?;

        let trusted_base = match request.base_url.as_deref() {
            Some(base) => Some(Url::parse(base)?),
            None => None,
        };

        let url = source_url(src, trusted_base.as_ref())?;

        if !is_trusted_origin(&url, trusted_base.as_ref()) {
            guard_url(&url).await?;
        }

        let timeout_secs = self.config.timeout.as_secs();
        let (bytes, ext) = tokio::time::timeout(
            self.config.timeout,
            self.download(url, trusted_base.as_ref()),
        )
        .await
        .map_err(|_| FetchError::Timeout(timeout_secs))??;

        let dest = request
            .dest_dir
            .join(format!("slide-{}.{}", request.slide_index, ext));
        tokio::fs::write(&dest, &bytes).await?;

        info!(
            slide = request.slide_index,
            bytes = bytes.len(),
            path = %dest.display(),
            "Resolved slide image"
        );
        Ok(dest)
    }

    /// Fetch the image, walking redirects by hand.
    async fn download(
        &self,
        mut url: Url,
        trusted_base: Option<&Url>,
    ) -> FetchResult<(Vec<u8>, &'static str)> {
        let mut hops = 0u32;

        let response = loop {
            let response = self.http.get(url.clone()).send().await?;

            if response.status().is_redirection() {
                hops += 1;
                if hops > self.config.max_redirects {
                    return Err(FetchError::TooManyRedirects(self.config.max_redirects));
                }

                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or(FetchError::RedirectMissingLocation)?;

                // Relative Location values resolve against the current URL.
                let next = url.join(location)?;
                debug!(hop = hops, next = %next, "Following redirect");

                if !is_trusted_origin(&next, trusted_base) {
                    guard_url(&next).await?;
                }

                url = next;
                continue;
            }

            if !response.status().is_success() {
                return Err(FetchError::BadStatus(response.status()));
            }

            break response;
        };

        let ext = validate_content_type(&response)?;

        // Fast fail on a declared length; the streaming cap below still
        // protects against bodies that lie.
        if let Some(declared) = response.content_length() {
            if declared > self.config.max_bytes {
                return Err(FetchError::TooLarge(self.config.max_bytes));
            }
        }

        let bytes = collect_capped(response.bytes_stream(), self.config.max_bytes).await?;
        Ok((bytes, ext))
    }
}

/// Parse an image source into a fetchable URL.
fn source_url(src: &str, trusted_base: Option<&Url>) -> FetchResult<Url> {
    if src.starts_with("/api/") {
        let base = trusted_base.ok_or_else(|| {
            FetchError::invalid_source("internal /api/ path given without a base URL")
        })?;
        return Ok(base.join(src)?);
    }

    if src.starts_with("http://") || src.starts_with("https://") {
        return Ok(Url::parse(src)?);
    }

    Err(FetchError::invalid_source(
        "image source must be an /api/ path or an absolute http(s) URL",
    ))
}

fn is_trusted_origin(url: &Url, trusted_base: Option<&Url>) -> bool {
    trusted_base
        .map(|base| base.origin() == url.origin())
        .unwrap_or(false)
}

fn looks_like_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://") || value.starts_with("data:")
}

/// Map the response's content type to a file extension, rejecting anything
/// that is not an allowed image type. Parameters after `;` are ignored.
fn validate_content_type(response: &Response) -> FetchResult<&'static str> {
    let header = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let base = header
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match base.as_str() {
        "image/png" | "image/jpeg" | "image/webp" => Ok(extension_for_mime(&base)),
        "" => Err(FetchError::UnsupportedContentType("none".to_string())),
        other => Err(FetchError::UnsupportedContentType(other.to_string())),
    }
}

/// Collect a byte stream, aborting as soon as the cumulative size passes the
/// cap regardless of what the headers declared.
async fn collect_capped<S, B>(stream: S, max_bytes: u64) -> FetchResult<Vec<u8>>
where
    S: Stream<Item = reqwest::Result<B>>,
    B: AsRef<[u8]>,
{
    pin_mut!(stream);

    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let chunk = chunk.as_ref();

        if (buf.len() + chunk.len()) as u64 > max_bytes {
            return Err(FetchError::TooLarge(max_bytes));
        }
        buf.extend_from_slice(chunk);
    }

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use slidereel_store::AssetStoreConfig;
    use std::path::Path;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 1, 2, 3];

    async fn fetcher(dir: &TempDir, config: FetchConfig) -> (Arc<AssetStore>, ImageFetcher) {
        let store = Arc::new(
            AssetStore::new(dir.path().join("assets"), AssetStoreConfig::default())
                .await
                .unwrap(),
        );
        let fetcher = ImageFetcher::new(Arc::clone(&store), config).unwrap();
        (store, fetcher)
    }

    fn request(dest: &Path, image_src: Option<&str>, base_url: Option<&str>) -> ResolveRequest {
        ResolveRequest {
            image_src: image_src.map(String::from),
            asset_id: None,
            owner_id: None,
            base_url: base_url.map(String::from),
            slide_index: 0,
            dest_dir: dest.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn test_resolves_api_path_on_trusted_origin() {
        let dir = TempDir::new().unwrap();
        let (_store, fetcher) = fetcher(&dir, FetchConfig::default()).await;

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/api/images/1.png"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(PNG_BYTES, "image/png"))
            .mount(&server)
            .await;

        let req = request(
            dir.path(),
            Some("/api/images/1.png"),
            Some(&server.uri()),
        );
        let path = fetcher.resolve(&req).await.unwrap();

        assert_eq!(path.file_name().unwrap(), "slide-0.png");
        assert_eq!(tokio::fs::read(&path).await.unwrap(), PNG_BYTES);
    }

    #[tokio::test]
    async fn test_untrusted_loopback_url_is_blocked() {
        let dir = TempDir::new().unwrap();
        let (_store, fetcher) = fetcher(&dir, FetchConfig::default()).await;

        // The mock server binds 127.0.0.1; without a trusted base the guard
        // must reject it before connecting.
        let server = MockServer::start().await;
        let src = format!("{}/api/images/1.png", server.uri());

        let req = request(dir.path(), Some(&src), None);
        let err = fetcher.resolve(&req).await.unwrap_err();

        assert!(matches!(err, FetchError::BlockedHost(_)));
    }

    #[tokio::test]
    async fn test_single_redirect_within_budget() {
        let dir = TempDir::new().unwrap();
        let (_store, fetcher) = fetcher(&dir, FetchConfig::default()).await;

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/api/old.png"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/api/new.png"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(url_path("/api/new.png"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(PNG_BYTES, "image/png"))
            .mount(&server)
            .await;

        let req = request(dir.path(), Some("/api/old.png"), Some(&server.uri()));
        let path = fetcher.resolve(&req).await.unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), PNG_BYTES);
    }

    #[tokio::test]
    async fn test_redirect_chain_exceeds_budget() {
        let dir = TempDir::new().unwrap();
        let (_store, fetcher) = fetcher(&dir, FetchConfig::default()).await;

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/api/a.png"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/api/b.png"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(url_path("/api/b.png"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/api/c.png"))
            .mount(&server)
            .await;

        let req = request(dir.path(), Some("/api/a.png"), Some(&server.uri()));
        let err = fetcher.resolve(&req).await.unwrap_err();

        assert!(matches!(err, FetchError::TooManyRedirects(1)));
    }

    #[tokio::test]
    async fn test_redirect_to_blocked_host_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (_store, fetcher) = fetcher(&dir, FetchConfig::default()).await;

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/api/leak.png"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("Location", "http://10.0.0.1/secret"),
            )
            .mount(&server)
            .await;

        let req = request(dir.path(), Some("/api/leak.png"), Some(&server.uri()));
        let err = fetcher.resolve(&req).await.unwrap_err();

        assert!(matches!(err, FetchError::BlockedHost(_)));
    }

    #[tokio::test]
    async fn test_declared_length_over_cap_fails_fast() {
        let dir = TempDir::new().unwrap();
        let config = FetchConfig {
            max_bytes: 16,
            ..FetchConfig::default()
        };
        let (_store, fetcher) = fetcher(&dir, config).await;

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/api/big.png"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 64], "image/png"))
            .mount(&server)
            .await;

        let req = request(dir.path(), Some("/api/big.png"), Some(&server.uri()));
        let err = fetcher.resolve(&req).await.unwrap_err();

        assert!(matches!(err, FetchError::TooLarge(16)));
    }

    #[tokio::test]
    async fn test_unsupported_content_type_rejected() {
        let dir = TempDir::new().unwrap();
        let (_store, fetcher) = fetcher(&dir, FetchConfig::default()).await;

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/api/page.html"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"<html>".to_vec(), "text/html"))
            .mount(&server)
            .await;

        let req = request(dir.path(), Some("/api/page.html"), Some(&server.uri()));
        let err = fetcher.resolve(&req).await.unwrap_err();

        assert!(matches!(err, FetchError::UnsupportedContentType(_)));
    }

    #[tokio::test]
    async fn test_content_type_parameters_ignored() {
        let dir = TempDir::new().unwrap();
        let (_store, fetcher) = fetcher(&dir, FetchConfig::default()).await;

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/api/img"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(PNG_BYTES, "image/jpeg; charset=binary"),
            )
            .mount(&server)
            .await;

        let req = request(dir.path(), Some("/api/img"), Some(&server.uri()));
        let path = fetcher.resolve(&req).await.unwrap();

        assert_eq!(path.file_name().unwrap(), "slide-0.jpg");
    }

    #[tokio::test]
    async fn test_error_status_rejected() {
        let dir = TempDir::new().unwrap();
        let (_store, fetcher) = fetcher(&dir, FetchConfig::default()).await;

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/api/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let req = request(dir.path(), Some("/api/missing.png"), Some(&server.uri()));
        let err = fetcher.resolve(&req).await.unwrap_err();

        assert!(matches!(err, FetchError::BadStatus(status) if status.as_u16() == 404));
    }

    #[tokio::test]
    async fn test_asset_reference_short_circuits() {
        let dir = TempDir::new().unwrap();
        let (store, fetcher) = fetcher(&dir, FetchConfig::default()).await;

        let asset = store
            .save(PNG_BYTES.to_vec(), "image/png", "user1")
            .await
            .unwrap();

        let mut req = request(dir.path(), None, None);
        req.asset_id = Some(asset.id.to_string());
        req.owner_id = Some("user1".to_string());

        let path = fetcher.resolve(&req).await.unwrap();
        assert_eq!(path, asset.path);
    }

    #[tokio::test]
    async fn test_unknown_asset_without_src_errors() {
        let dir = TempDir::new().unwrap();
        let (_store, fetcher) = fetcher(&dir, FetchConfig::default()).await;

        let mut req = request(dir.path(), None, None);
        req.asset_id = Some("not-a-real-asset".to_string());

        let err = fetcher.resolve(&req).await.unwrap_err();
        assert!(matches!(err, FetchError::AssetNotFound(_)));
    }

    #[tokio::test]
    async fn test_url_shaped_asset_id_treated_as_absent() {
        let dir = TempDir::new().unwrap();
        let (_store, fetcher) = fetcher(&dir, FetchConfig::default()).await;

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/api/images/1.png"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(PNG_BYTES, "image/png"))
            .mount(&server)
            .await;

        let mut req = request(
            dir.path(),
            Some("/api/images/1.png"),
            Some(&server.uri()),
        );
        req.asset_id = Some("http://evil.example/image.png".to_string());

        // Falls through to imageSrc; the URL-shaped id is never looked up.
        let path = fetcher.resolve(&req).await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), PNG_BYTES);
    }

    #[tokio::test]
    async fn test_data_url_rejected() {
        let dir = TempDir::new().unwrap();
        let (_store, fetcher) = fetcher(&dir, FetchConfig::default()).await;

        let req = request(dir.path(), Some("data:image/png;base64,AAAA"), None);
        let err = fetcher.resolve(&req).await.unwrap_err();

        assert!(matches!(err, FetchError::InvalidSource(_)));
    }

    #[tokio::test]
    async fn test_collect_capped_aborts_mid_stream() {
        let chunks = vec![
            reqwest::Result::Ok(vec![0u8; 600]),
            reqwest::Result::Ok(vec![0u8; 600]),
        ];
        let err = collect_capped(stream::iter(chunks), 1000).await.unwrap_err();
        assert!(matches!(err, FetchError::TooLarge(1000)));
    }

    #[tokio::test]
    async fn test_collect_capped_allows_exact_cap() {
        let chunks = vec![
            reqwest::Result::Ok(vec![0u8; 500]),
            reqwest::Result::Ok(vec![0u8; 500]),
        ];
        let buf = collect_capped(stream::iter(chunks), 1000).await.unwrap();
        assert_eq!(buf.len(), 1000);
    }

    #[test]
    fn test_source_url_requires_base_for_api_paths() {
        let err = source_url("/api/images/1.png", None).unwrap_err();
        assert!(matches!(err, FetchError::InvalidSource(_)));
    }

    #[test]
    fn test_source_url_rejects_relative_paths() {
        let base = Url::parse("http://app.internal").unwrap();
        let err = source_url("images/1.png", Some(&base)).unwrap_err();
        assert!(matches!(err, FetchError::InvalidSource(_)));
    }
}
