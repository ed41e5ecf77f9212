//! Cross-crate trait definitions.

pub mod cache;
