//! Segment rendering and final concatenation.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use slidereel_models::{EncodingConfig, JobId, Slide};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::escape::escape_concat_path;

/// Silent stereo track matched to each segment so concatenation never has to
/// reconcile audio-less inputs.
const SILENT_AUDIO: &str = "anullsrc=channel_layout=stereo:sample_rate=44100";

/// Default per-invocation encoder timeout.
pub const DEFAULT_ENCODER_TIMEOUT_SECS: u64 = 300;

/// Progress value reported just before concatenation starts.
pub const PROGRESS_PRE_CONCAT: u8 = 95;

/// Encoder invocation settings shared by every segment of a job.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub encoding: EncodingConfig,
    pub timeout_secs: u64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            encoding: EncodingConfig::default(),
            timeout_secs: DEFAULT_ENCODER_TIMEOUT_SECS,
        }
    }
}

/// Encode one slide image into `segment-<index>.mp4` inside `out_dir`.
///
/// The image is looped for the slide's duration at the target frame rate and
/// muxed with synthesized silence; `-shortest` pins the container length to
/// the video track.
pub async fn render_segment(
    input: &Path,
    slide: &Slide,
    filter: &str,
    fps: u32,
    out_dir: &Path,
    index: usize,
    settings: &RenderSettings,
) -> MediaResult<PathBuf> {
    if !input.exists() {
        return Err(MediaError::MissingInput(input.to_path_buf()));
    }

    let output = out_dir.join(format!("segment-{index}.mp4"));
    let duration = format!("{:.3}", slide.duration_sec);

    let cmd = FfmpegCommand::new(&output)
        .input_with_args(
            ["-loop", "1", "-framerate", &fps.to_string(), "-t", &duration],
            input.to_string_lossy(),
        )
        .input_with_args(["-f", "lavfi", "-t", &duration], SILENT_AUDIO)
        .video_filter(filter)
        .output_args(settings.encoding.to_ffmpeg_args())
        .output_args(["-shortest", "-movflags", "+faststart"]);

    debug!(segment = index, duration = %duration, "Encoding segment");
    FfmpegRunner::new()
        .with_timeout(settings.timeout_secs)
        .run(&cmd)
        .await?;

    Ok(output)
}

/// Join encoded segments into `render-<job_id>.mp4` via the concat demuxer.
///
/// Writes `concat.txt` next to the segments (one quoted path per line,
/// embedded quotes escaped) and stream-copies, so no re-encode happens here.
pub async fn concatenate_segments(
    segments: &[PathBuf],
    out_dir: &Path,
    job_id: &JobId,
    settings: &RenderSettings,
) -> MediaResult<PathBuf> {
    if segments.is_empty() {
        return Err(MediaError::UnusableMedia(
            "no segments to concatenate".to_string(),
        ));
    }

    let output = out_dir.join(format!("render-{job_id}.mp4"));
    let list_path = out_dir.join("concat.txt");

    let list_content: String = segments
        .iter()
        .map(|p| format!("file '{}'", escape_concat_path(&p.to_string_lossy())))
        .collect::<Vec<_>>()
        .join("\n");

    tokio::fs::write(&list_path, &list_content).await?;

    let cmd = FfmpegCommand::new(&output)
        .input_with_args(["-f", "concat", "-safe", "0"], list_path.to_string_lossy())
        .output_args(["-c", "copy", "-movflags", "+faststart"]);

    FfmpegRunner::new()
        .with_timeout(settings.timeout_secs)
        .run(&cmd)
        .await?;

    info!(
        segments = segments.len(),
        output = %output.display(),
        "Concatenated segments"
    );
    Ok(output)
}

/// Progress after segment `completed` of `total` has been encoded.
///
/// Scales to 90 with one extra phantom step so the value lands below the
/// pre-concat mark even when the last segment finishes.
pub fn segment_progress(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / (total as f64 + 1.0)) * 90.0).round() as u8
}
