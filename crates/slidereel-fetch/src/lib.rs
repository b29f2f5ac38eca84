//! Secure slide image resolution.
//!
//! This crate provides:
//! - SSRF validation of outbound URLs (scheme, hostname, resolved addresses)
//! - Manual redirect walking with a hop budget
//! - Content-type allowlisting and hard byte caps on downloads
//! - Asset-store short-circuiting for previously uploaded images

pub mod error;
pub mod resolver;
pub mod ssrf;

pub use error::{FetchError, FetchResult};
pub use resolver::{FetchConfig, ImageFetcher, ResolveRequest};
pub use ssrf::{guard_url, is_blocked_addr};
