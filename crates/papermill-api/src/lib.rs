//! # papermill-api
//!
//! The HTTP surface: enqueue endpoints, batch lifecycle, queue stats
//! and control, error inspection, and mail transport verification.
//! Handlers take exactly one trip through the queue manager or trackers;
//! all job processing happens elsewhere.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
