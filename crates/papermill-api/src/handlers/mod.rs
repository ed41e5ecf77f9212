//! HTTP request handlers, organized by domain.

pub mod batch;
pub mod email;
pub mod health;
pub mod jobs;
pub mod queue;
