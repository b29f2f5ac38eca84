//! The render pipeline run by each job task.
//!
//! Resolution is concurrent, encoding is sequential: every slide image is
//! fetched up front so a bad reference fails the job before any encoder
//! time is spent, then segments are encoded one at a time so a single
//! FFmpeg process owns the CPU.

use futures_util::future::try_join_all;
use std::path::PathBuf;
use tracing::{info, warn};

use slidereel_fetch::{ImageFetcher, ResolveRequest};
use slidereel_media::{
    build_slide_filter, concatenate_segments, generate_poster, render_segment, segment_progress,
    PROGRESS_PRE_CONCAT,
};
use slidereel_models::{JobId, VideoProject};
use slidereel_store::ensure_dir;

use crate::config::SchedulerConfig;
use crate::error::{JobError, JobResult};
use crate::store::JobStore;

/// Poster frame written next to the rendered video.
const POSTER_FILE: &str = "poster.jpg";

/// Execute one render job from start to completion.
///
/// Drives the job record through `running` and into `done`; failures are
/// returned to the caller, which owns the `error` transition.
pub async fn run_render_job(
    store: &JobStore,
    fetcher: &ImageFetcher,
    config: &SchedulerConfig,
    job_id: &JobId,
    project: &VideoProject,
    base_url: Option<String>,
) -> JobResult<()> {
    if !store.start(job_id).await {
        return Err(JobError::NotFound(job_id.to_string()));
    }

    let work_dir = config.jobs_root.join(job_id.as_str());
    ensure_dir(&work_dir)
        .await
        .map_err(|e| JobError::work_dir(format!("{}: {e}", work_dir.display())))?;
    store.set_work_dir(job_id, work_dir.clone()).await;

    let owner_id = store
        .get(job_id)
        .await
        .ok_or_else(|| JobError::NotFound(job_id.to_string()))?
        .user_id;

    let requests: Vec<ResolveRequest> = project
        .slides
        .iter()
        .enumerate()
        .map(|(index, slide)| ResolveRequest {
            image_src: slide.image_src.clone(),
            asset_id: slide.asset_id.clone(),
            owner_id: owner_id.clone(),
            base_url: base_url.clone(),
            slide_index: index,
            dest_dir: work_dir.clone(),
        })
        .collect();

    let images: Vec<PathBuf> =
        try_join_all(requests.iter().map(|request| fetcher.resolve(request))).await?;

    info!(
        job_id = %job_id,
        slides = images.len(),
        "Resolved all slide images"
    );

    let (width, height) = project.canvas_size();
    let settings = config.render_settings();
    let total = project.slides.len();

    let mut segments = Vec::with_capacity(total);
    for (index, (slide, image)) in project.slides.iter().zip(&images).enumerate() {
        let filter = build_slide_filter(slide, width, height, project.fps);
        let segment = render_segment(
            image,
            slide,
            &filter,
            project.fps,
            &work_dir,
            index,
            &settings,
        )
        .await?;
        segments.push(segment);
        store
            .set_progress(job_id, segment_progress(index + 1, total))
            .await;
    }

    store.set_progress(job_id, PROGRESS_PRE_CONCAT).await;
    let output = concatenate_segments(&segments, &work_dir, job_id, &settings).await?;

    store.complete(job_id, output.clone()).await;

    // Best effort; the job is already done by this point.
    let poster = work_dir.join(POSTER_FILE);
    if let Err(e) = generate_poster(&output, &poster).await {
        warn!(job_id = %job_id, error = %e, "Poster generation failed");
    }

    Ok(())
}
