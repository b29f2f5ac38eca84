//! Job scheduling and lifetime management.
//!
//! One scheduler owns the job registry, the spawned render tasks and the
//! eviction sweeper. Callers hand it a validated project and poll the
//! returned job ID; everything after acceptance happens in the background.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use slidereel_fetch::ImageFetcher;
use slidereel_models::{
    validate_project, JobId, JobStatus, RenderJob, ValidationError, VideoProject,
};
use slidereel_store::AssetStore;

use crate::config::SchedulerConfig;
use crate::metrics::{
    record_job_completed, record_job_created, record_job_evicted, record_job_failed,
};
use crate::pipeline::run_render_job;
use crate::store::JobStore;

/// Client-facing view of a job record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub status: JobStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&RenderJob> for JobView {
    fn from(job: &RenderJob) -> Self {
        Self {
            status: job.status,
            progress: job.progress,
            error: job.error.clone(),
        }
    }
}

/// Accepts render requests and runs them to completion in the background.
pub struct JobScheduler {
    store: JobStore,
    assets: Arc<AssetStore>,
    fetcher: ImageFetcher,
    config: SchedulerConfig,
    tasks: Mutex<HashMap<JobId, JoinHandle<()>>>,
}

impl JobScheduler {
    pub fn new(assets: Arc<AssetStore>, fetcher: ImageFetcher, config: SchedulerConfig) -> Self {
        Self {
            store: JobStore::new(),
            assets,
            fetcher,
            config,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// The asset store images are resolved against.
    pub fn assets(&self) -> &Arc<AssetStore> {
        &self.assets
    }

    /// Validate a project and start rendering it.
    ///
    /// Rejected projects leave no trace: no job record, no directory, no
    /// task. Accepted ones return immediately with the ID to poll.
    pub async fn create(
        self: &Arc<Self>,
        project: VideoProject,
        user_id: Option<String>,
        base_url: Option<String>,
    ) -> Result<JobId, ValidationError> {
        validate_project(&project)?;

        let job = RenderJob::new(user_id);
        let job_id = job.id.clone();
        let slides = project.slides.len();
        self.store.insert(job).await;
        record_job_created();

        let scheduler = Arc::clone(self);
        let task_id = job_id.clone();
        let handle = tokio::spawn(async move {
            scheduler.run_job(task_id, project, base_url).await;
        });
        self.tasks.lock().await.insert(job_id.clone(), handle);

        info!(job_id = %job_id, slides, "Created render job");
        Ok(job_id)
    }

    async fn run_job(
        self: Arc<Self>,
        job_id: JobId,
        project: VideoProject,
        base_url: Option<String>,
    ) {
        let started = Instant::now();
        let result = run_render_job(
            &self.store,
            &self.fetcher,
            &self.config,
            &job_id,
            &project,
            base_url,
        )
        .await;

        match result {
            Ok(()) => {
                let elapsed = started.elapsed().as_secs_f64();
                record_job_completed(elapsed);
                info!(job_id = %job_id, duration_secs = elapsed, "Render job completed");
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Render job failed");
                self.store.fail(&job_id, &e.to_string()).await;
                record_job_failed();
            }
        }
    }

    /// Look up a job's current status, progress and error.
    pub async fn get(&self, job_id: &JobId) -> Option<JobView> {
        self.store.get(job_id).await.map(|job| JobView::from(&job))
    }

    /// The rendered file of a finished job.
    pub async fn output_path(&self, job_id: &JobId) -> Option<PathBuf> {
        self.store
            .get(job_id)
            .await
            .filter(|job| job.status == JobStatus::Done)
            .and_then(|job| job.output_path)
    }

    /// Whether a job's rendered file exists on disk.
    pub async fn has_output(&self, job_id: &JobId) -> bool {
        match self.output_path(job_id).await {
            Some(path) => path.exists(),
            None => false,
        }
    }

    /// Block until a job's render task has finished, then return its view.
    ///
    /// Returns the current view immediately when no task is tracked for the
    /// ID, which covers both finished-and-swept and unknown jobs.
    pub async fn wait_for(&self, job_id: &JobId) -> Option<JobView> {
        let handle = self.tasks.lock().await.remove(job_id);
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(job_id = %job_id, error = %e, "Render task panicked");
                self.store.fail(job_id, "Render task panicked").await;
            }
        }
        self.get(job_id).await
    }

    /// Spawn the periodic eviction sweeper.
    pub fn start_eviction(self: &Arc<Self>) {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scheduler.config.sweep_interval);
            // The first tick completes immediately; skip it
            ticker.tick().await;
            loop {
                ticker.tick().await;
                scheduler.sweep_once().await;
            }
        });

        info!(
            interval_secs = self.config.sweep_interval.as_secs(),
            ttl_secs = self.config.job_ttl.as_secs(),
            max_jobs = self.config.max_jobs,
            "Job eviction sweeper started"
        );
    }

    /// Run one eviction pass, returning how many jobs were removed.
    ///
    /// Terminal jobs older than the TTL go first; if the registry still
    /// exceeds the cap afterwards, the oldest records go regardless of
    /// status. A running job evicted this way keeps rendering; its final
    /// transition lands on a missing record and is dropped.
    pub async fn sweep_once(&self) -> usize {
        {
            let mut tasks = self.tasks.lock().await;
            tasks.retain(|_, handle| !handle.is_finished());
        }

        let now = Utc::now();
        let mut evict: Vec<RenderJob> = Vec::new();
        let mut keep: Vec<RenderJob> = Vec::new();

        for job in self.store.snapshot().await {
            if job.is_terminal() && self.is_expired(&job, now) {
                evict.push(job);
            } else {
                keep.push(job);
            }
        }

        if keep.len() > self.config.max_jobs {
            keep.sort_by_key(|job| job.created_at);
            let excess = keep.len() - self.config.max_jobs;
            evict.extend(keep.drain(..excess));
        }

        let removed = evict.len();
        for job in evict {
            self.evict_job(job).await;
        }

        if removed > 0 {
            let remaining = self.store.len().await;
            info!(removed, remaining, "Evicted render jobs");
        }
        removed
    }

    fn is_expired(&self, job: &RenderJob, now: DateTime<Utc>) -> bool {
        match now.signed_duration_since(job.created_at).to_std() {
            Ok(age) => age > self.config.job_ttl,
            // A creation time in the future reads as not expired
            Err(_) => false,
        }
    }

    async fn evict_job(&self, job: RenderJob) {
        self.store.remove(&job.id).await;

        if let Some(dir) = &job.work_dir {
            if let Err(e) = tokio::fs::remove_dir_all(dir).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(job_id = %job.id, error = %e, "Failed to remove job work dir");
                }
            }
        }

        record_job_evicted();
        debug!(job_id = %job.id, status = %job.status, "Evicted job");
    }

    #[cfg(test)]
    pub(crate) fn job_store(&self) -> &JobStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    use slidereel_fetch::FetchConfig;
    use slidereel_models::Slide;
    use slidereel_store::AssetStoreConfig;

    async fn scheduler(dir: &Path, config: SchedulerConfig) -> Arc<JobScheduler> {
        let assets = Arc::new(
            AssetStore::new(dir.join("assets"), AssetStoreConfig::default())
                .await
                .unwrap(),
        );
        let fetcher = ImageFetcher::new(Arc::clone(&assets), FetchConfig::default()).unwrap();
        Arc::new(JobScheduler::new(assets, fetcher, config))
    }

    fn project_with_slides(count: usize) -> VideoProject {
        VideoProject {
            id: None,
            quality: Default::default(),
            format: Default::default(),
            fps: 30,
            width: None,
            height: None,
            slides: (0..count)
                .map(|_| Slide {
                    image_src: Some("https://example.com/a.png".to_string()),
                    ..Default::default()
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_invalid_project_rejected_without_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let config = SchedulerConfig {
            jobs_root: dir.path().join("jobs"),
            ..Default::default()
        };
        let scheduler = scheduler(dir.path(), config).await;

        let err = scheduler
            .create(project_with_slides(21), None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ValidationError::TooManySlides { got: 21, .. }));
        assert!(scheduler.job_store().is_empty().await);
        assert!(scheduler.tasks.lock().await.is_empty());
        assert!(!dir.path().join("jobs").exists());
    }

    #[tokio::test]
    async fn test_blocked_image_fails_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let config = SchedulerConfig {
            jobs_root: dir.path().join("jobs"),
            ..Default::default()
        };
        let scheduler = scheduler(dir.path(), config).await;

        let mut project = project_with_slides(1);
        project.slides[0].image_src = Some("http://127.0.0.1:1/a.png".to_string());

        let job_id = scheduler.create(project, None, None).await.unwrap();
        let view = scheduler.wait_for(&job_id).await.unwrap();

        assert_eq!(view.status, JobStatus::Error);
        assert!(view.error.as_deref().unwrap().contains("Blocked host"));
        assert!(!scheduler.has_output(&job_id).await);
        assert!(scheduler.output_path(&job_id).await.is_none());
    }

    #[tokio::test]
    async fn test_ttl_sweep_removes_only_old_terminal_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let config = SchedulerConfig {
            jobs_root: dir.path().join("jobs"),
            job_ttl: Duration::from_secs(3600),
            ..Default::default()
        };
        let scheduler = scheduler(dir.path(), config).await;
        let old = Utc::now() - chrono::Duration::hours(2);

        // An expired done job with a work dir on disk
        let mut done = RenderJob::new(None);
        let done_id = done.id.clone();
        let done_dir = dir.path().join("jobs").join(done_id.as_str());
        tokio::fs::create_dir_all(&done_dir).await.unwrap();
        tokio::fs::write(done_dir.join("render.mp4"), b"x").await.unwrap();
        done.start();
        done.complete(done_dir.join("render.mp4"));
        done.set_work_dir(done_dir.clone());
        done.created_at = old;
        scheduler.job_store().insert(done).await;

        // An equally old job that is still running
        let mut running = RenderJob::new(None);
        let running_id = running.id.clone();
        running.start();
        running.created_at = old;
        scheduler.job_store().insert(running).await;

        let removed = scheduler.sweep_once().await;

        assert_eq!(removed, 1);
        assert!(scheduler.get(&done_id).await.is_none());
        assert!(!done_dir.exists());
        assert!(scheduler.get(&running_id).await.is_some());
    }

    #[tokio::test]
    async fn test_cap_evicts_oldest_regardless_of_status() {
        let dir = tempfile::tempdir().unwrap();
        let config = SchedulerConfig {
            jobs_root: dir.path().join("jobs"),
            job_ttl: Duration::from_secs(6 * 3600),
            max_jobs: 3,
            ..Default::default()
        };
        let scheduler = scheduler(dir.path(), config).await;

        let mut ids = Vec::new();
        for minutes_ago in (0..5).rev() {
            let mut job = RenderJob::new(None);
            job.created_at = Utc::now() - chrono::Duration::minutes(minutes_ago);
            if minutes_ago == 4 {
                // Oldest record is mid-render; the cap takes it anyway
                job.start();
            }
            ids.push(job.id.clone());
            scheduler.job_store().insert(job).await;
        }

        let removed = scheduler.sweep_once().await;

        assert_eq!(removed, 2);
        assert_eq!(scheduler.job_store().len().await, 3);
        assert!(scheduler.get(&ids[0]).await.is_none());
        assert!(scheduler.get(&ids[1]).await.is_none());
        for id in &ids[2..] {
            assert!(scheduler.get(id).await.is_some());
        }
    }

    #[tokio::test]
    async fn test_sweep_prunes_finished_task_handles() {
        let dir = tempfile::tempdir().unwrap();
        let config = SchedulerConfig {
            jobs_root: dir.path().join("jobs"),
            ..Default::default()
        };
        let scheduler = scheduler(dir.path(), config).await;

        let mut project = project_with_slides(1);
        project.slides[0].image_src = Some("http://localhost/a.png".to_string());

        let job_id = scheduler.create(project, None, None).await.unwrap();
        scheduler.wait_for(&job_id).await.unwrap();

        // wait_for already removed the handle; a second sweep stays clean
        scheduler.sweep_once().await;
        assert!(scheduler.tasks.lock().await.is_empty());

        // The record itself survives until TTL or cap takes it
        assert!(scheduler.get(&job_id).await.is_some());
    }

    #[tokio::test]
    async fn test_wait_for_unknown_job() {
        let dir = tempfile::tempdir().unwrap();
        let config = SchedulerConfig {
            jobs_root: dir.path().join("jobs"),
            ..Default::default()
        };
        let scheduler = scheduler(dir.path(), config).await;

        assert!(scheduler.wait_for(&JobId::new()).await.is_none());
    }
}
