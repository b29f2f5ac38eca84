//! Scheduler configuration.

use std::path::PathBuf;
use std::time::Duration;

use slidereel_media::{RenderSettings, DEFAULT_ENCODER_TIMEOUT_SECS};
use slidereel_models::EncodingConfig;

/// Default root for per-job working directories.
const DEFAULT_JOBS_ROOT: &str = "/tmp/slidereel/jobs";

/// Default job record TTL.
const DEFAULT_JOB_TTL_SECS: u64 = 6 * 60 * 60;

/// Default cap on stored job records.
const DEFAULT_MAX_JOBS: usize = 20;

/// Default interval between eviction sweeps.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30 * 60;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Root directory under which each job gets a private work dir
    pub jobs_root: PathBuf,
    /// Age after which terminal jobs are evicted
    pub job_ttl: Duration,
    /// Maximum stored job records; the excess is evicted oldest-first
    pub max_jobs: usize,
    /// Interval between eviction sweeps
    pub sweep_interval: Duration,
    /// Per-invocation encoder timeout
    pub encoder_timeout: Duration,
    /// Encoding profile applied to every segment
    pub encoding: EncodingConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            jobs_root: PathBuf::from(DEFAULT_JOBS_ROOT),
            job_ttl: Duration::from_secs(DEFAULT_JOB_TTL_SECS),
            max_jobs: DEFAULT_MAX_JOBS,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            encoder_timeout: Duration::from_secs(DEFAULT_ENCODER_TIMEOUT_SECS),
            encoding: EncodingConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            jobs_root: std::env::var("JOBS_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_JOBS_ROOT)),
            job_ttl: Duration::from_secs(
                std::env::var("JOB_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_JOB_TTL_SECS),
            ),
            max_jobs: std::env::var("MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_JOBS),
            sweep_interval: Duration::from_secs(
                std::env::var("JOB_SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
            ),
            encoder_timeout: Duration::from_secs(
                std::env::var("ENCODER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_ENCODER_TIMEOUT_SECS),
            ),
            encoding: EncodingConfig::default(),
        }
    }

    /// Encoder invocation settings derived from this config.
    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            encoding: self.encoding.clone(),
            timeout_secs: self.encoder_timeout.as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.max_jobs, 20);
        assert_eq!(config.job_ttl, Duration::from_secs(6 * 60 * 60));
        assert_eq!(config.sweep_interval, Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_render_settings_carry_timeout() {
        let config = SchedulerConfig {
            encoder_timeout: Duration::from_secs(42),
            ..SchedulerConfig::default()
        };
        assert_eq!(config.render_settings().timeout_secs, 42);
    }
}
