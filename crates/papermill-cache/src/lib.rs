//! # papermill-cache
//!
//! Shared-store provider implementations for Papermill. Supports two modes:
//!
//! - **memory**: In-process store using [moka](https://crates.io/crates/moka)
//!   and [dashmap](https://crates.io/crates/dashmap)
//! - **redis**: Redis-backed store using the [redis](https://crates.io/crates/redis) crate
//!
//! The provider is selected at runtime based on configuration. Besides
//! plain key-value caching, the store carries the batch progress hashes
//! and the bounded per-batch error lists.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::CacheManager;
