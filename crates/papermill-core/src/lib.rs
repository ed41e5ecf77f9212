//! # papermill-core
//!
//! Core crate for Papermill. Contains configuration schemas, typed
//! identifiers, domain payload types, the tenant registry, the cache
//! provider trait, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Papermill crates.

pub mod config;
pub mod error;
pub mod result;
pub mod tenants;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
