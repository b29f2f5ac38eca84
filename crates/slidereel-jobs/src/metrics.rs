//! Job metrics.
//!
//! Recorded through the `metrics` facade; installing an exporter is left to
//! the embedding application.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_CREATED_TOTAL: &str = "slidereel_jobs_created_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "slidereel_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "slidereel_jobs_failed_total";
    pub const JOBS_EVICTED_TOTAL: &str = "slidereel_jobs_evicted_total";
    pub const RENDER_DURATION_SECONDS: &str = "slidereel_render_duration_seconds";
}

/// Record a job accepted by the scheduler.
pub fn record_job_created() {
    counter!(names::JOBS_CREATED_TOTAL).increment(1);
}

/// Record a job that reached `done`, with its wall-clock render time.
pub fn record_job_completed(duration_secs: f64) {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
    histogram!(names::RENDER_DURATION_SECONDS).record(duration_secs);
}

/// Record a job that reached `error`.
pub fn record_job_failed() {
    counter!(names::JOBS_FAILED_TOTAL).increment(1);
}

/// Record a job record removed by an eviction sweep.
pub fn record_job_evicted() {
    counter!(names::JOBS_EVICTED_TOTAL).increment(1);
}
