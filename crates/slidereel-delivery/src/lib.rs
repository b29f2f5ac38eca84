//! Byte-range delivery of rendered videos.
//!
//! This crate provides:
//! - `Range` header parsing with clamping and fallback rules
//! - Streaming 200/206/416 responses over rendered files

pub mod error;
pub mod range;
pub mod stream;

pub use error::{DeliveryError, DeliveryResult};
pub use range::{parse_range, RangeOutcome};
pub use stream::{serve_file, VIDEO_CONTENT_TYPE};
