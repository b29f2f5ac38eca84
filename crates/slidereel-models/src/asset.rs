//! Stored upload metadata.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for a stored asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    /// Generate a new random asset ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A temporarily stored uploaded file.
///
/// A record is only valid while its backing file exists on disk; the store
/// purges records whose file has vanished on the next lookup.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Asset {
    /// Unique asset ID
    pub id: AssetId,

    /// Owning user
    pub owner_id: String,

    /// Absolute path of the stored file
    pub path: PathBuf,

    /// Declared mime type
    pub mime: String,

    /// File size in bytes
    pub size: u64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last read timestamp, refreshed on each lookup
    pub last_used_at: DateTime<Utc>,
}

impl Asset {
    /// Create a record for a freshly written file.
    pub fn new(owner_id: impl Into<String>, path: PathBuf, mime: impl Into<String>, size: u64) -> Self {
        let now = Utc::now();
        Self {
            id: AssetId::new(),
            owner_id: owner_id.into(),
            path,
            mime: mime.into(),
            size,
            created_at: now,
            last_used_at: now,
        }
    }

    /// Refresh the idle clock.
    pub fn touch(&mut self) {
        self.last_used_at = Utc::now();
    }
}

/// File extension for a stored image mime type.
///
/// Unknown types fall back to `jpg`, matching how the render pipeline treats
/// any non-PNG, non-WebP input.
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime.trim() {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_ids_are_unique() {
        assert_ne!(AssetId::new(), AssetId::new());
    }

    #[test]
    fn test_touch_refreshes_last_used() {
        let mut asset = Asset::new("user1", PathBuf::from("/tmp/a.png"), "image/png", 10);
        let before = asset.last_used_at;
        asset.touch();
        assert!(asset.last_used_at >= before);
    }

    #[test]
    fn test_extension_for_mime() {
        assert_eq!(extension_for_mime("image/png"), "png");
        assert_eq!(extension_for_mime("image/webp"), "webp");
        assert_eq!(extension_for_mime("image/jpeg"), "jpg");
        assert_eq!(extension_for_mime("application/octet-stream"), "jpg");
    }
}
