//! Command-line renderer.
//!
//! Reads a slideshow project from a JSON file, renders it through the full
//! pipeline and prints the path of the finished video.
//!
//! Usage: `slidereel-render <project.json>`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use slidereel_fetch::{FetchConfig, ImageFetcher};
use slidereel_jobs::{JobScheduler, SchedulerConfig};
use slidereel_media::check_ffmpeg;
use slidereel_models::{JobStatus, VideoProject};
use slidereel_store::{AssetStore, AssetStoreConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("Usage: slidereel-render <project.json>")?;

    // Fail before reading anything if the encoder is missing
    let ffmpeg = check_ffmpeg()?;
    info!(ffmpeg = %ffmpeg.display(), "Found FFmpeg");

    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let project: VideoProject = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid project file {}", path.display()))?;

    let config = SchedulerConfig::from_env();
    let assets = Arc::new(
        AssetStore::new(config.jobs_root.join("assets"), AssetStoreConfig::from_env()).await?,
    );
    let fetcher = ImageFetcher::new(Arc::clone(&assets), FetchConfig::from_env())?;
    let scheduler = Arc::new(JobScheduler::new(assets, fetcher, config));

    let base_url = std::env::var("SLIDEREEL_BASE_URL").ok();
    let job_id = scheduler
        .create(project, None, base_url)
        .await
        .map_err(|e| anyhow::anyhow!("Rejected project: {e}"))?;

    let view = scheduler
        .wait_for(&job_id)
        .await
        .context("Job record disappeared")?;

    match view.status {
        JobStatus::Done => {
            let output = scheduler
                .output_path(&job_id)
                .await
                .context("Finished job has no output path")?;
            println!("{}", output.display());
            Ok(())
        }
        _ => Err(anyhow::anyhow!(
            "Render failed: {}",
            view.error.as_deref().unwrap_or("unknown error")
        )),
    }
}

/// Initialize tracing with colored output for dev, JSON for production.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("slidereel=info,warn"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
}
