//! Delivery error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for delivery operations.
pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Errors while serving a rendered file.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to build response: {0}")]
    Response(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
