//! Shared data models for the Slidereel render service.
//!
//! This crate provides Serde-serializable types for:
//! - Slideshow projects and slides
//! - Render jobs and their state machine
//! - Stored upload assets
//! - Encoding configuration
//! - Project validation

pub mod asset;
pub mod encoding;
pub mod job;
pub mod project;
pub mod validate;

// Re-export common types
pub use asset::{extension_for_mime, Asset, AssetId};
pub use encoding::EncodingConfig;
pub use job::{JobId, JobStatus, RenderJob};
pub use project::{
    Animation, FontStyle, OutputFormat, OverlayPosition, Quality, Slide, VideoProject,
};
pub use validate::{validate_project, ValidationError};
