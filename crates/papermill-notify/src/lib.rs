//! # papermill-notify
//!
//! The failure notification pipeline: a bounded per-(tenant, batch)
//! error log in the shared store, plus a best-effort callback to the
//! tenant's owning system. Recording a failure is durable; notifying the
//! owner is advisory and never affects job processing.

pub mod notifier;
pub mod pipeline;

pub use notifier::{FailureNote, HttpOwnerNotifier, OwnerNotifier};
pub use pipeline::{ErrorRecord, FailurePipeline};
