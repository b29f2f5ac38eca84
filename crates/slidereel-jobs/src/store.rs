//! In-memory job registry.
//!
//! A `RwLock<HashMap>` behind methods that enforce the state machine: every
//! mutation happens inside one guard scope with no await across it, so
//! readers never observe a half-updated record.

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use slidereel_models::{JobId, RenderJob};

/// Registry of render jobs.
#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, RenderJob>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly created job.
    pub async fn insert(&self, job: RenderJob) {
        let mut jobs = self.jobs.write().await;
        jobs.insert(job.id.clone(), job);
    }

    /// Clone out a job record.
    pub async fn get(&self, id: &JobId) -> Option<RenderJob> {
        let jobs = self.jobs.read().await;
        jobs.get(id).cloned()
    }

    /// Apply a closure to a job record. Returns false when the record is
    /// gone, which happens when eviction raced the running task.
    pub async fn update<F>(&self, id: &JobId, f: F) -> bool
    where
        F: FnOnce(&mut RenderJob),
    {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(id) {
            Some(job) => {
                f(job);
                true
            }
            None => false,
        }
    }

    /// Move a job to running.
    pub async fn start(&self, id: &JobId) -> bool {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(id) {
            Some(job) => {
                let ok = job.start();
                if !ok {
                    warn!(job_id = %id, status = %job.status, "Ignoring start for non-queued job");
                }
                ok
            }
            None => {
                warn!(job_id = %id, "Job record gone, dropping start transition");
                false
            }
        }
    }

    /// Record the working directory allocated for a job.
    pub async fn set_work_dir(&self, id: &JobId, dir: PathBuf) -> bool {
        self.update(id, |job| job.set_work_dir(dir)).await
    }

    /// Raise a job's progress; values below the current one are ignored.
    pub async fn set_progress(&self, id: &JobId, progress: u8) {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(id) {
            Some(job) => job.set_progress(progress),
            None => debug!(job_id = %id, "Job record gone, dropping progress update"),
        }
    }

    /// Move a job to done with its rendered output.
    pub async fn complete(&self, id: &JobId, output: PathBuf) -> bool {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(id) {
            Some(job) => {
                let ok = job.complete(output);
                if !ok {
                    warn!(job_id = %id, status = %job.status, "Ignoring complete for terminal job");
                }
                ok
            }
            None => {
                warn!(job_id = %id, "Job record gone, dropping completion");
                false
            }
        }
    }

    /// Move a job to error with a failure message.
    pub async fn fail(&self, id: &JobId, message: &str) -> bool {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(id) {
            Some(job) => {
                let ok = job.fail(message);
                if !ok {
                    warn!(job_id = %id, status = %job.status, "Ignoring fail for terminal job");
                }
                ok
            }
            None => {
                warn!(job_id = %id, "Job record gone, dropping failure");
                false
            }
        }
    }

    /// Remove a job record, returning it.
    pub async fn remove(&self, id: &JobId) -> Option<RenderJob> {
        let mut jobs = self.jobs.write().await;
        jobs.remove(id)
    }

    /// Clone out every record, for eviction sweeps.
    pub async fn snapshot(&self) -> Vec<RenderJob> {
        let jobs = self.jobs.read().await;
        jobs.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidereel_models::JobStatus;

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = JobStore::new();
        let job = RenderJob::new(Some("user1".to_string()));
        let id = job.id.clone();

        store.insert(job).await;

        let fetched = store.get(&id).await.unwrap();
        assert_eq!(fetched.status, JobStatus::Queued);
        assert_eq!(fetched.user_id.as_deref(), Some("user1"));
    }

    #[tokio::test]
    async fn test_lifecycle_through_store() {
        let store = JobStore::new();
        let job = RenderJob::new(None);
        let id = job.id.clone();
        store.insert(job).await;

        assert!(store.start(&id).await);
        store.set_progress(&id, 45).await;
        assert!(store.complete(&id, PathBuf::from("/tmp/out.mp4")).await);

        let job = store.get(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.progress, 100);
    }

    #[tokio::test]
    async fn test_terminal_absorbs_later_transitions() {
        let store = JobStore::new();
        let job = RenderJob::new(None);
        let id = job.id.clone();
        store.insert(job).await;

        store.start(&id).await;
        assert!(store.fail(&id, "boom").await);

        // A late completion from the task must not resurrect the job
        assert!(!store.complete(&id, PathBuf::from("/tmp/out.mp4")).await);

        let job = store.get(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert!(job.output_path.is_none());
    }

    #[tokio::test]
    async fn test_updates_after_removal_are_dropped() {
        let store = JobStore::new();
        let job = RenderJob::new(None);
        let id = job.id.clone();
        store.insert(job).await;

        store.remove(&id).await.unwrap();

        assert!(!store.start(&id).await);
        assert!(!store.complete(&id, PathBuf::from("/tmp/out.mp4")).await);
        assert!(!store.fail(&id, "late").await);
        store.set_progress(&id, 50).await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_progress_monotonic_through_store() {
        let store = JobStore::new();
        let job = RenderJob::new(None);
        let id = job.id.clone();
        store.insert(job).await;

        store.set_progress(&id, 60).await;
        store.set_progress(&id, 30).await;

        assert_eq!(store.get(&id).await.unwrap().progress, 60);
    }

    #[tokio::test]
    async fn test_snapshot_clones_all_records() {
        let store = JobStore::new();
        for _ in 0..3 {
            store.insert(RenderJob::new(None)).await;
        }

        assert_eq!(store.snapshot().await.len(), 3);
        assert_eq!(store.len().await, 3);
    }
}
