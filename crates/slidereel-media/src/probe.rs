//! Inspection of rendered output via ffprobe.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Key facts about a video file: duration and size from the container,
/// geometry and codec from the first video stream.
#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub codec: String,
    pub size: u64,
}

/// The slice of ffprobe's JSON report we ask for. `-select_streams v:0`
/// narrows `streams` to at most the first video stream.
#[derive(Debug, Deserialize)]
struct ProbeReport {
    #[serde(default)]
    streams: Vec<StreamFacts>,
    format: FormatFacts,
}

#[derive(Debug, Deserialize)]
struct StreamFacts {
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FormatFacts {
    duration: Option<String>,
    size: Option<String>,
}

/// Probe a video file.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::MissingInput(path.to_path_buf()));
    }

    let report = run_ffprobe(path).await?;

    let stream = report.streams.into_iter().next().ok_or_else(|| {
        MediaError::UnusableMedia(format!("no video stream in {}", path.display()))
    })?;

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .or(stream.r_frame_rate.as_deref())
        .and_then(parse_rate)
        .unwrap_or(0.0);

    Ok(VideoInfo {
        duration: parse_or_zero(report.format.duration),
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        fps,
        codec: stream.codec_name.unwrap_or_default(),
        size: parse_or_zero(report.format.size),
    })
}

async fn run_ffprobe(path: &Path) -> MediaResult<ProbeReport> {
    let binary = check_ffprobe()?;

    let output = Command::new(&binary)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=codec_name,width,height,avg_frame_rate,r_frame_rate:format=duration,size",
            "-of",
            "json",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::ProbeFailed {
            path: path.to_path_buf(),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(serde_json::from_slice(&output.stdout)?)
}

/// ffprobe reports numbers as JSON strings; absent or unparsable means zero.
fn parse_or_zero<T: std::str::FromStr + Default>(raw: Option<String>) -> T {
    raw.and_then(|s| s.parse().ok()).unwrap_or_default()
}

/// Frame rates arrive as a fraction ("30000/1001"), occasionally as a bare
/// decimal.
fn parse_rate(raw: &str) -> Option<f64> {
    match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            (den > 0.0).then(|| num / den)
        }
        None => raw.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate_fraction_and_decimal() {
        assert!((parse_rate("24/1").unwrap() - 24.0).abs() < 1e-6);
        assert!((parse_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_rate("12.5").unwrap() - 12.5).abs() < 1e-6);
    }

    #[test]
    fn test_parse_rate_rejects_garbage() {
        assert!(parse_rate("30/0").is_none());
        assert!(parse_rate("bogus").is_none());
    }

    #[test]
    fn test_report_tolerates_missing_streams() {
        let raw = r#"{"format":{"duration":"3.004","size":"10240"}}"#;
        let report: ProbeReport = serde_json::from_str(raw).unwrap();
        assert!(report.streams.is_empty());
        assert_eq!(report.format.duration.as_deref(), Some("3.004"));
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let err = probe_video("/nonexistent/render.mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::MissingInput(_)));
    }
}
