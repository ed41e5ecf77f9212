//! # papermill-batch
//!
//! Batch progress accounting: atomic, crash-tolerant counters over the
//! shared store, independent of job execution order.

pub mod tracker;

pub use tracker::{BatchMeta, BatchStatus, BatchTracker};
