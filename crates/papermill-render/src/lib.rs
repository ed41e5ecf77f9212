//! # papermill-render
//!
//! The rendering resource pool: owns the lifecycle of one shared external
//! rendering engine instance and hands out isolated execution contexts to
//! render jobs. Launching the engine is expensive and non-idempotent, so
//! cold starts are strictly single-flight; concurrent renders share the
//! one engine process without sharing rendering state.

pub mod artifact;
pub mod backend;
pub mod pool;
pub mod template;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use artifact::{ArtifactStore, LocalArtifactStore};
pub use backend::{RenderBackend, RenderContext, RenderEngine};
pub use pool::{PoolState, RenderPool};
pub use template::{BasicTemplater, Templater};
