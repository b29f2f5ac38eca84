//! In-memory asset registry over a temp directory.
//!
//! Uploaded slide images live here between upload and render. Records are
//! process-local and expire on idle time; the backing files sit in one root
//! directory owned by the store.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{debug, info, warn};

use slidereel_models::{extension_for_mime, Asset, AssetId};

use crate::error::StoreResult;
use crate::fs::{ensure_dir, move_file};

/// Default idle TTL before an asset is swept.
const DEFAULT_TTL_SECS: u64 = 8 * 60 * 60;

/// Default interval between cleanup sweeps.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30 * 60;

/// Asset store configuration.
#[derive(Debug, Clone)]
pub struct AssetStoreConfig {
    /// Idle time after which an asset is deleted
    pub ttl: Duration,
    /// Interval between cleanup sweeps
    pub sweep_interval: Duration,
}

impl Default for AssetStoreConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

impl AssetStoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            ttl: Duration::from_secs(
                std::env::var("ASSET_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_TTL_SECS),
            ),
            sweep_interval: Duration::from_secs(
                std::env::var("ASSET_SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
            ),
        }
    }
}

/// Content handed to [`AssetStore::save`].
#[derive(Debug)]
pub enum AssetSource {
    /// Raw bytes, written to a fresh file in the store root.
    Bytes(Vec<u8>),
    /// An existing file, moved into the store root (EXDEV-aware).
    File(PathBuf),
}

impl From<Vec<u8>> for AssetSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<PathBuf> for AssetSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

/// Registry of temporarily stored uploads.
///
/// Lookups refresh the idle clock; a record whose backing file has vanished
/// is purged on the lookup that discovers it.
pub struct AssetStore {
    root: PathBuf,
    config: AssetStoreConfig,
    assets: RwLock<HashMap<AssetId, Asset>>,
}

impl AssetStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl Into<PathBuf>, config: AssetStoreConfig) -> StoreResult<Self> {
        let root = root.into();
        ensure_dir(&root).await?;

        Ok(Self {
            root,
            config,
            assets: RwLock::new(HashMap::new()),
        })
    }

    /// Store an upload and return its record.
    ///
    /// The file lands at `<root>/<uuid>.<ext>` with the extension derived
    /// from the declared mime type.
    pub async fn save(
        &self,
        source: impl Into<AssetSource>,
        mime: &str,
        owner_id: &str,
    ) -> StoreResult<Asset> {
        let id = AssetId::new();
        let ext = extension_for_mime(mime);
        let path = self.root.join(format!("{id}.{ext}"));

        match source.into() {
            AssetSource::Bytes(bytes) => {
                tokio::fs::write(&path, &bytes).await?;
            }
            AssetSource::File(src) => {
                move_file(&src, &path).await?;
            }
        }

        let size = tokio::fs::metadata(&path).await?.len();

        let mut asset = Asset::new(owner_id, path, mime, size);
        asset.id = id.clone();

        {
            let mut assets = self.assets.write().await;
            assets.insert(id.clone(), asset.clone());
        }

        debug!(asset_id = %id, owner_id = %owner_id, size, "Stored asset");
        Ok(asset)
    }

    /// Look up an asset, refreshing its idle clock.
    ///
    /// Returns `None` for an unknown id, an owner mismatch, or a record whose
    /// backing file is gone (the stale record is dropped as a side effect).
    pub async fn get(&self, id: &AssetId, owner_id: Option<&str>) -> Option<Asset> {
        let mut assets = self.assets.write().await;

        let asset = assets.get_mut(id)?;

        if let Some(owner) = owner_id {
            if asset.owner_id != owner {
                return None;
            }
        }

        if !asset.path.exists() {
            warn!(asset_id = %id, "Backing file missing, purging stale asset record");
            assets.remove(id);
            return None;
        }

        asset.touch();
        Some(asset.clone())
    }

    /// Refresh an asset's idle clock without reading it.
    pub async fn touch(&self, id: &AssetId) {
        let mut assets = self.assets.write().await;
        if let Some(asset) = assets.get_mut(id) {
            asset.touch();
        }
    }

    /// Number of live records.
    pub async fn len(&self) -> usize {
        self.assets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.assets.read().await.is_empty()
    }

    /// Start the background cleanup loop.
    pub fn start_cleanup(self: &Arc<Self>) {
        let store = Arc::clone(self);

        info!(
            ttl_secs = store.config.ttl.as_secs(),
            interval_secs = store.config.sweep_interval.as_secs(),
            "Starting asset cleanup sweeper"
        );

        tokio::spawn(async move {
            let mut ticker = interval(store.config.sweep_interval);
            // First tick fires immediately; skip it so a fresh store isn't
            // swept at startup.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                store.sweep_once().await;
            }
        });
    }

    /// Run a single cleanup cycle, returning how many assets were removed.
    pub async fn sweep_once(&self) -> usize {
        let now = Utc::now();

        let expired: Vec<(AssetId, PathBuf)> = {
            let assets = self.assets.read().await;
            assets
                .values()
                .filter(|a| is_idle_expired(a.last_used_at, self.config.ttl, now))
                .map(|a| (a.id.clone(), a.path.clone()))
                .collect()
        };

        if expired.is_empty() {
            return 0;
        }

        // Delete files outside the lock; a failed delete still drops the
        // record so the id cannot be served again.
        for (id, path) in &expired {
            if let Err(e) = tokio::fs::remove_file(path).await {
                warn!(asset_id = %id, path = %path.display(), "Failed to delete expired asset file: {}", e);
            }
        }

        let removed = {
            let mut assets = self.assets.write().await;
            let before = assets.len();
            for (id, _) in &expired {
                assets.remove(id);
            }
            before - assets.len()
        };

        info!(removed, "Asset cleanup sweep finished");
        removed
    }

    /// Rewind an asset's idle clock for TTL tests.
    #[cfg(test)]
    pub(crate) async fn rewind_last_used(&self, id: &AssetId, secs: i64) {
        let mut assets = self.assets.write().await;
        if let Some(asset) = assets.get_mut(id) {
            asset.last_used_at = asset.last_used_at - chrono::Duration::seconds(secs);
        }
    }
}

fn is_idle_expired(last_used_at: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> bool {
    match now.signed_duration_since(last_used_at).to_std() {
        Ok(idle) => idle > ttl,
        // last_used_at in the future means clock skew; keep the record.
        Err(_) => false,
    }
}
