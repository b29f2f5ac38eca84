//! Temporary asset storage.
//!
//! This crate provides:
//! - An in-memory asset registry over a temp directory
//! - Idle-TTL cleanup sweeps
//! - EXDEV-aware file moves for cross-filesystem uploads

pub mod assets;
pub mod error;
pub mod fs;

pub use assets::{AssetSource, AssetStore, AssetStoreConfig};
pub use error::{StoreError, StoreResult};
pub use fs::{ensure_dir, move_file};
