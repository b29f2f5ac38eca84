//! Background render job scheduling.
//!
//! This crate provides:
//! - An in-memory job registry with a forward-only state machine
//! - The render pipeline (resolve images, encode segments, concatenate)
//! - A scheduler that spawns one task per accepted job
//! - TTL and capacity eviction of job records and their work dirs
//! - Job lifecycle metrics

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod scheduler;
pub mod store;

pub use config::SchedulerConfig;
pub use error::{JobError, JobResult};
pub use pipeline::run_render_job;
pub use scheduler::{JobScheduler, JobView};
pub use store::JobStore;
