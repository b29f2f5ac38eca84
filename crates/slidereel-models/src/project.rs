//! Slideshow project definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum number of slides per project.
pub const MAX_SLIDES: usize = 20;
/// Maximum overlay text length in characters.
pub const MAX_OVERLAY_CHARS: usize = 120;
/// Frame rates accepted for rendering.
pub const ALLOWED_FPS: &[u32] = &[12, 24, 30, 60];
/// Smallest accepted canvas dimension.
pub const MIN_DIMENSION: u32 = 64;
/// Largest accepted canvas dimension.
pub const MAX_DIMENSION: u32 = 4096;
/// Slide duration bounds in seconds.
pub const MIN_SLIDE_SECS: f64 = 1.0;
pub const MAX_SLIDE_SECS: f64 = 10.0;

/// Output quality preset, mapping to a default canvas size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum Quality {
    #[default]
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    Hd1080,
}

impl Quality {
    /// Default canvas (width, height) for this quality.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Quality::Hd720 => (1280, 720),
            Quality::Hd1080 => (1920, 1080),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Hd720 => "720p",
            Quality::Hd1080 => "1080p",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Quality {
    type Err = QualityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "720p" => Ok(Quality::Hd720),
            "1080p" => Ok(Quality::Hd1080),
            _ => Err(QualityParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown quality: {0}")]
pub struct QualityParseError(String);

/// Container format for the rendered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp4,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Overlay font selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Modern,
    Classic,
    Bold,
    Mono,
}

impl FontStyle {
    /// Path of the bundled font backing this style.
    pub fn font_file(&self) -> &'static str {
        match self {
            FontStyle::Modern => "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            FontStyle::Classic => "/usr/share/fonts/truetype/dejavu/DejaVuSerif.ttf",
            FontStyle::Bold => "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
            FontStyle::Mono => "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
        }
    }
}

/// Where the overlay text is anchored on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverlayPosition {
    Top,
    Center,
    #[default]
    Bottom,
    /// Anchored at `xPct`/`yPct` of the canvas.
    Custom,
}

/// Per-slide animation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub enum Animation {
    FadeIn,
    Slide,
    Zoom,
    Rotate,
    #[default]
    None,
}

impl Animation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Animation::FadeIn => "fadeIn",
            Animation::Slide => "slide",
            Animation::Zoom => "zoom",
            Animation::Rotate => "rotate",
            Animation::None => "none",
        }
    }
}

impl fmt::Display for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One image + overlay + animation unit of a project.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    /// `/api/...` path or absolute http(s) URL of the source image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_src: Option<String>,

    /// Reference into the asset store, used instead of `imageSrc`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,

    /// How long this slide is shown, in seconds.
    pub duration_sec: f64,

    /// Text drawn over the slide.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_text: Option<String>,

    /// Overlay color as `#RRGGBB`. White when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_color_hex: Option<String>,

    #[serde(default)]
    pub font_style: FontStyle,

    #[serde(default = "default_font_size")]
    pub font_size_px: u32,

    #[serde(default)]
    pub position: OverlayPosition,

    /// Horizontal anchor in [0, 1], required when `position` is `custom`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_pct: Option<f64>,

    /// Vertical anchor in [0, 1], required when `position` is `custom`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_pct: Option<f64>,

    #[serde(default)]
    pub animation: Animation,
}

fn default_font_size() -> u32 {
    48
}

impl Default for Slide {
    fn default() -> Self {
        Self {
            image_src: None,
            asset_id: None,
            duration_sec: 3.0,
            overlay_text: None,
            overlay_color_hex: None,
            font_style: FontStyle::default(),
            font_size_px: default_font_size(),
            position: OverlayPosition::default(),
            x_pct: None,
            y_pct: None,
            animation: Animation::default(),
        }
    }
}

/// A submitted slideshow project. Immutable once accepted.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoProject {
    /// Client-assigned identifier, carried through for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub quality: Quality,

    #[serde(default)]
    pub format: OutputFormat,

    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Explicit canvas width, overriding the quality preset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    /// Explicit canvas height, overriding the quality preset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    pub slides: Vec<Slide>,
}

fn default_fps() -> u32 {
    30
}

impl VideoProject {
    /// Effective canvas (width, height): the explicit override when both
    /// dimensions are present, otherwise the quality preset.
    pub fn canvas_size(&self) -> (u32, u32) {
        match (self.width, self.height) {
            (Some(w), Some(h)) => (w, h),
            _ => self.quality.dimensions(),
        }
    }
}
