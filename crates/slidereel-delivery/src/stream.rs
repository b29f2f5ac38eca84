//! Range-aware file streaming responses.

use std::io::SeekFrom;
use std::path::Path;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::{DeliveryError, DeliveryResult};
use crate::range::{parse_range, RangeOutcome};

/// Content type of every delivered render.
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Serve a rendered file, honoring an optional `Range` header.
///
/// Returns 200 with the whole file when no usable range is present, 206 with
/// the requested span, or 416 when the range lies outside the file. The body
/// is streamed from disk rather than buffered; a mid-stream read error
/// terminates the connection without retry.
pub async fn serve_file(
    path: impl AsRef<Path>,
    range_header: Option<&str>,
) -> DeliveryResult<Response> {
    let path = path.as_ref();

    let mut file = File::open(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DeliveryError::NotFound(path.to_path_buf())
        } else {
            DeliveryError::Io(e)
        }
    })?;
    let size = file.metadata().await?.len();

    match parse_range(range_header, size) {
        RangeOutcome::Full => {
            let stream = ReaderStream::new(file);

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, VIDEO_CONTENT_TYPE)
                .header(header::ACCEPT_RANGES, "bytes")
                .header(header::CONTENT_LENGTH, size)
                .body(Body::from_stream(stream))
                .map_err(|e| DeliveryError::Response(e.to_string()))
        }
        RangeOutcome::Partial { start, end } => {
            debug!(
                path = %path.display(),
                start,
                end,
                size,
                "Serving partial content"
            );

            file.seek(SeekFrom::Start(start)).await?;
            let span = end - start + 1;
            let stream = ReaderStream::new(file.take(span));

            Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_TYPE, VIDEO_CONTENT_TYPE)
                .header(header::ACCEPT_RANGES, "bytes")
                .header(header::CONTENT_LENGTH, span)
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {start}-{end}/{size}"),
                )
                .body(Body::from_stream(stream))
                .map_err(|e| DeliveryError::Response(e.to_string()))
        }
        RangeOutcome::Unsatisfiable => Response::builder()
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(header::CONTENT_TYPE, VIDEO_CONTENT_TYPE)
            .header(header::ACCEPT_RANGES, "bytes")
            .header(header::CONTENT_RANGE, format!("bytes */{size}"))
            .body(Body::empty())
            .map_err(|e| DeliveryError::Response(e.to_string())),
    }
}
