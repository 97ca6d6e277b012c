//! Background job processing and scheduled tasks for Loopline.
//!
//! This crate provides:
//! - A worker runner that polls for and executes queued jobs
//! - A cron scheduler that enqueues the daily unseen-message digest
//! - A job executor that dispatches jobs to the correct handler
//! - Handlers for connection emails, story expiry, and digests

pub mod executor;
pub mod jobs;
pub mod queue;
pub mod runner;
pub mod scheduler;

pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use queue::JobQueue;
pub use runner::WorkerRunner;
pub use scheduler::CronScheduler;
