//! Render job records and their state machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for a render job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Render job status. Transitions are forward-only:
/// `queued -> running -> {done, error}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, background work not yet started
    #[default]
    Queued,
    /// Background render in progress
    Running,
    /// Output file produced
    Done,
    /// Render failed; see the job's error field
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tracked asynchronous render request.
///
/// The working directory and output file share one lifetime: both are
/// created by the render task and removed together at eviction.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RenderJob {
    /// Unique job ID
    pub id: JobId,

    /// Owning user, when the caller supplied one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Current status
    #[serde(default)]
    pub status: JobStatus,

    /// Private working directory, set when the render task starts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,

    /// Final rendered file, set only on done
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    /// Progress (0-100), monotonically non-decreasing
    #[serde(default)]
    pub progress: u8,

    /// Failure message, set only on error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl RenderJob {
    /// Create a new job in the queued state.
    pub fn new(user_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            user_id,
            status: JobStatus::Queued,
            work_dir: None,
            output_path: None,
            progress: 0,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to running. Returns false (and leaves the record untouched)
    /// unless the job is currently queued.
    pub fn start(&mut self) -> bool {
        if self.status != JobStatus::Queued {
            return false;
        }
        self.status = JobStatus::Running;
        self.updated_at = Utc::now();
        true
    }

    /// Record the working directory allocated for this job.
    pub fn set_work_dir(&mut self, dir: PathBuf) {
        self.work_dir = Some(dir);
        self.updated_at = Utc::now();
    }

    /// Move to done with the rendered output. Ignored from a terminal state.
    pub fn complete(&mut self, output: PathBuf) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Done;
        self.output_path = Some(output);
        self.progress = 100;
        self.updated_at = Utc::now();
        true
    }

    /// Move to error with a failure message. Ignored from a terminal state.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Error;
        self.error = Some(message.into());
        self.updated_at = Utc::now();
        true
    }

    /// Raise progress. Values below the current one are ignored so progress
    /// never moves backwards.
    pub fn set_progress(&mut self, progress: u8) {
        let clamped = progress.min(100);
        if clamped > self.progress {
            self.progress = clamped;
            self.updated_at = Utc::now();
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_queued() {
        let job = RenderJob::new(Some("user123".to_string()));
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert!(job.work_dir.is_none());
        assert!(job.output_path.is_none());
    }

    #[test]
    fn test_forward_transitions() {
        let mut job = RenderJob::new(None);
        assert!(job.start());
        assert_eq!(job.status, JobStatus::Running);

        assert!(job.complete(PathBuf::from("/tmp/out.mp4")));
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.progress, 100);
        assert!(job.output_path.is_some());
    }

    #[test]
    fn test_terminal_states_absorb() {
        let mut job = RenderJob::new(None);
        job.start();
        job.fail("encoder exploded");
        assert_eq!(job.status, JobStatus::Error);

        // Neither transition applies once terminal
        assert!(!job.complete(PathBuf::from("/tmp/out.mp4")));
        assert!(!job.start());
        assert_eq!(job.status, JobStatus::Error);
        assert!(job.output_path.is_none());
    }

    #[test]
    fn test_start_requires_queued() {
        let mut job = RenderJob::new(None);
        job.start();
        assert!(!job.start());
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut job = RenderJob::new(None);
        job.set_progress(40);
        job.set_progress(25);
        assert_eq!(job.progress, 40);
        job.set_progress(95);
        assert_eq!(job.progress, 95);
        job.set_progress(250);
        assert_eq!(job.progress, 100);
    }

    #[test]
    fn test_error_recorded() {
        let mut job = RenderJob::new(None);
        job.start();
        assert!(job.fail("image too large"));
        assert_eq!(job.error.as_deref(), Some("image too large"));
    }
}
