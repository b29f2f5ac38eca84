//! Job error types.

use thiserror::Error;

/// Result type for job operations.
pub type JobResult<T> = Result<T, JobError>;

/// Umbrella error for the render pipeline.
///
/// Everything a background render task can fail with converges here; the
/// task wrapper renders it into the job record's `error` field.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Work directory error: {0}")]
    WorkDir(String),

    #[error("{0}")]
    Validation(#[from] slidereel_models::ValidationError),

    #[error("Image resolution failed: {0}")]
    Fetch(#[from] slidereel_fetch::FetchError),

    #[error("Encoding failed: {0}")]
    Media(#[from] slidereel_media::MediaError),

    #[error("Asset storage failed: {0}")]
    Store(#[from] slidereel_store::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl JobError {
    pub fn work_dir(msg: impl Into<String>) -> Self {
        Self::WorkDir(msg.into())
    }
}
