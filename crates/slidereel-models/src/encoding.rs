//! Encoder output settings.
//!
//! One config struct carries everything that ends up after the last input in
//! an ffmpeg invocation. Segment encodes and the final mux share it, so a
//! quality change applies to both.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Width the poster frame is scaled to; height follows the aspect ratio.
pub const POSTER_SCALE_WIDTH: u32 = 480;
/// Timestamp the poster frame is pulled from.
pub const POSTER_TIMESTAMP: &str = "00:00:00.5";

/// Codec and quality knobs for the encoder.
///
/// Fields absent from a JSON body fall back to the `Default` values, which
/// target broadly-compatible H.264 + AAC in MP4.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EncodingConfig {
    pub codec: String,
    pub preset: String,
    /// Constant Rate Factor, 0-51, lower is better quality.
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
    /// Appended verbatim after the generated arguments.
    pub extra_args: Vec<String>,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: "libx264".into(),
            preset: "veryfast".into(),
            crf: 23,
            audio_codec: "aac".into(),
            audio_bitrate: "128k".into(),
            extra_args: Vec::new(),
        }
    }
}

impl EncodingConfig {
    /// Render into ffmpeg output arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let crf = self.crf.to_string();
        let fixed = [
            "-c:v",
            self.codec.as_str(),
            "-preset",
            self.preset.as_str(),
            "-crf",
            crf.as_str(),
            "-c:a",
            self.audio_codec.as_str(),
            "-b:a",
            self.audio_bitrate.as_str(),
        ];
        fixed
            .into_iter()
            .map(str::to_string)
            .chain(self.extra_args.iter().cloned())
            .collect()
    }
}
