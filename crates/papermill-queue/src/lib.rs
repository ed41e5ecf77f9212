//! # papermill-queue
//!
//! Per-tenant job queues for document generation and notification work.
//!
//! This crate provides:
//! - A queue manager that provisions a render/notification queue pair
//!   per configured tenant and fronts all enqueue operations
//! - A dispatcher per queue with priority ordering, delayed jobs,
//!   bounded concurrency, and exponential-backoff retries
//! - A job executor that dispatches jobs to the correct handler
//! - Built-in handlers for rendering documents and sending notifications

pub mod executor;
pub mod job;
pub mod jobs;
pub mod manager;
pub mod queue;

pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use job::{EnqueueOptions, Job, JobKind};
pub use manager::QueueManager;
pub use queue::QueueStats;
