//! Project validation.
//!
//! A single ordered pass over a submitted project; the first violated rule
//! produces the error and validation stops. Enum-valued fields (quality,
//! format, animation) are already constrained by their types at the
//! deserialization boundary, so the rules here cover the numeric and
//! structural remainder.

use thiserror::Error;

use crate::project::{
    OverlayPosition, Slide, VideoProject, ALLOWED_FPS, MAX_DIMENSION, MAX_OVERLAY_CHARS,
    MAX_SLIDES, MAX_SLIDE_SECS, MIN_DIMENSION, MIN_SLIDE_SECS,
};

/// A rejected project. Returned synchronously from job creation before any
/// job record or directory is allocated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("project must contain at least one slide")]
    NoSlides,

    #[error("project exceeds the maximum of {max} slides (got {got})")]
    TooManySlides { max: usize, got: usize },

    #[error("unsupported frame rate {0}; allowed values are 12, 24, 30 and 60")]
    UnsupportedFps(u32),

    #[error("width and height must be provided together")]
    IncompleteDimensions,

    #[error("dimensions must be even values between {MIN_DIMENSION} and {MAX_DIMENSION} (got {width}x{height})")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("slide {index}: an imageSrc or assetId is required")]
    MissingImageSource { index: usize },

    #[error("slide {index}: data URLs are not accepted; upload the image or host it instead")]
    DataUrlRejected { index: usize },

    #[error("slide {index}: durationSec must be between 1 and 10 (got {got})")]
    InvalidDuration { index: usize, got: f64 },

    #[error("slide {index}: overlay text exceeds {max} characters")]
    OverlayTooLong { index: usize, max: usize },

    #[error("slide {index}: overlay color must be a 6-digit hex value like #1A2B3C")]
    InvalidHexColor { index: usize },

    #[error("slide {index}: custom position requires xPct and yPct between 0 and 1")]
    InvalidCustomPosition { index: usize },
}

/// Validate a submitted project. First violation wins.
pub fn validate_project(project: &VideoProject) -> Result<(), ValidationError> {
    if project.slides.is_empty() {
        return Err(ValidationError::NoSlides);
    }
    if project.slides.len() > MAX_SLIDES {
        return Err(ValidationError::TooManySlides {
            max: MAX_SLIDES,
            got: project.slides.len(),
        });
    }

    if !ALLOWED_FPS.contains(&project.fps) {
        return Err(ValidationError::UnsupportedFps(project.fps));
    }

    match (project.width, project.height) {
        (None, None) => {}
        (Some(w), Some(h)) => {
            if !dimension_ok(w) || !dimension_ok(h) {
                return Err(ValidationError::InvalidDimensions {
                    width: w,
                    height: h,
                });
            }
        }
        _ => return Err(ValidationError::IncompleteDimensions),
    }

    for (index, slide) in project.slides.iter().enumerate() {
        validate_slide(index, slide)?;
    }

    Ok(())
}

fn validate_slide(index: usize, slide: &Slide) -> Result<(), ValidationError> {
    let has_src = slide.image_src.as_deref().is_some_and(|s| !s.is_empty());
    let has_asset = slide.asset_id.as_deref().is_some_and(|s| !s.is_empty());
    if !has_src && !has_asset {
        return Err(ValidationError::MissingImageSource { index });
    }

    if let Some(src) = slide.image_src.as_deref() {
        if src.starts_with("data:") {
            return Err(ValidationError::DataUrlRejected { index });
        }
    }

    if !slide.duration_sec.is_finite()
        || slide.duration_sec < MIN_SLIDE_SECS
        || slide.duration_sec > MAX_SLIDE_SECS
    {
        return Err(ValidationError::InvalidDuration {
            index,
            got: slide.duration_sec,
        });
    }

    if let Some(text) = slide.overlay_text.as_deref() {
        if text.chars().count() > MAX_OVERLAY_CHARS {
            return Err(ValidationError::OverlayTooLong {
                index,
                max: MAX_OVERLAY_CHARS,
            });
        }
    }

    if let Some(color) = slide.overlay_color_hex.as_deref() {
        if !is_hex_color(color) {
            return Err(ValidationError::InvalidHexColor { index });
        }
    }

    if slide.position == OverlayPosition::Custom {
        let ok = matches!(
            (slide.x_pct, slide.y_pct),
            (Some(x), Some(y)) if pct_ok(x) && pct_ok(y)
        );
        if !ok {
            return Err(ValidationError::InvalidCustomPosition { index });
        }
    }

    Ok(())
}

fn dimension_ok(value: u32) -> bool {
    (MIN_DIMENSION..=MAX_DIMENSION).contains(&value) && value % 2 == 0
}

fn pct_ok(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

/// Strict `#RRGGBB` check, no regex needed.
fn is_hex_color(s: &str) -> bool {
    let Some(rest) = s.strip_prefix('#') else {
        return false;
    };
    rest.len() == 6 && rest.chars().all(|c| c.is_ascii_hexdigit())
}
