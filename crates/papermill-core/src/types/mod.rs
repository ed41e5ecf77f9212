//! Shared domain types.

pub mod document;
pub mod id;

pub use document::{DocumentRecord, RecipientData};
pub use id::JobId;
