//! Filesystem helpers for asset files.
//!
//! Uploads may arrive on a different filesystem than the store root (tmpfs
//! upload dir vs. persistent volume), so moves must survive EXDEV.

use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

/// Create a directory (and parents) if it does not exist yet.
pub async fn ensure_dir(path: impl AsRef<Path>) -> StoreResult<()> {
    let path = path.as_ref();
    if !path.exists() {
        fs::create_dir_all(path).await?;
    }
    Ok(())
}

/// Move a file from `src` to `dst`, handling cross-device moves.
///
/// Tries a fast rename first. On EXDEV the file is copied to a temp name in
/// the destination directory and renamed into place, so the destination never
/// holds a half-written file under its final name.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> StoreResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if !src.exists() {
        return Err(StoreError::SourceNotFound(src.to_path_buf()));
    }

    if let Some(parent) = dst.parent() {
        ensure_dir(parent).await?;
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            debug!(
                src = %src.display(),
                dst = %dst.display(),
                "Cross-device rename, falling back to copy+delete"
            );
            copy_and_delete(src, dst).await
        }
        Err(e) => Err(StoreError::from(e)),
    }
}

/// EXDEV is error code 18 on Linux/macOS.
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

async fn copy_and_delete(src: &Path, dst: &Path) -> StoreResult<()> {
    let tmp_dst = dst.with_extension("tmp");

    fs::copy(src, &tmp_dst).await?;

    if let Err(e) = fs::rename(&tmp_dst, dst).await {
        let _ = std::fs::remove_file(&tmp_dst);
        return Err(StoreError::from(e));
    }

    // Best effort: the move already succeeded from the caller's view.
    if let Err(e) = fs::remove_file(src).await {
        warn!(
            src = %src.display(),
            "Failed to remove source after cross-device move: {}", e
        );
    }

    Ok(())
}
