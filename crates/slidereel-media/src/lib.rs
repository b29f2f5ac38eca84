//! FFmpeg CLI wrapper for slideshow rendering.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Per-slide filter graph construction (fit, animation, caption, fade)
//! - Segment encoding and lossless concatenation
//! - Poster frame extraction
//! - Stream metadata probing via ffprobe

pub mod command;
pub mod error;
pub mod escape;
pub mod filters;
pub mod poster;
pub mod probe;
pub mod render;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use escape::{escape_concat_path, escape_filter_value};
pub use filters::build_slide_filter;
pub use poster::generate_poster;
pub use probe::{probe_video, VideoInfo};
pub use render::{
    concatenate_segments, render_segment, segment_progress, RenderSettings,
    DEFAULT_ENCODER_TIMEOUT_SECS, PROGRESS_PRE_CONCAT,
};
