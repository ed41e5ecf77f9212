//! Job executor. Dispatches jobs to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use papermill_core::error::AppError;

use crate::job::{Job, JobKind};

/// Trait for job handler implementations
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// The job kind this handler processes
    fn kind(&self) -> JobKind;

    /// Execute the job
    async fn execute(&self, job: &Job) -> Result<Value, JobExecutionError>;
}

/// Error from job execution
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Permanent failure. Do not retry.
    #[error("Permanent job failure: {0}")]
    Permanent(String),

    /// Transient failure. May retry.
    #[error("Transient job failure: {0}")]
    Transient(String),
}

impl JobExecutionError {
    /// Whether the runner may retry after this failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, JobExecutionError::Transient(_))
    }

    /// The failure message without the classification prefix.
    pub fn message(&self) -> &str {
        match self {
            JobExecutionError::Permanent(msg) | JobExecutionError::Transient(msg) => msg,
        }
    }
}

impl From<AppError> for JobExecutionError {
    /// Classify by error kind: infrastructure failures retry, caller
    /// mistakes do not.
    fn from(err: AppError) -> Self {
        if err.is_retryable() {
            JobExecutionError::Transient(err.to_string())
        } else {
            JobExecutionError::Permanent(err.to_string())
        }
    }
}

/// Dispatches jobs to the appropriate handler based on kind
#[derive(Debug, Default)]
pub struct JobExecutor {
    /// Registered job handlers by kind
    handlers: HashMap<JobKind, Arc<dyn JobHandler>>,
}

impl JobExecutor {
    /// Create a new job executor
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job handler
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let kind = handler.kind();
        tracing::info!("Registered job handler for kind '{}'", kind);
        self.handlers.insert(kind, handler);
    }

    /// Execute a job by dispatching to the correct handler
    pub async fn execute(&self, job: &Job) -> Result<Value, JobExecutionError> {
        let handler = self.handlers.get(&job.kind).ok_or_else(|| {
            JobExecutionError::Permanent(format!(
                "No handler registered for job kind '{}'",
                job.kind
            ))
        })?;

        tracing::debug!(
            "Executing job: id={}, kind='{}', attempt={}/{}",
            job.id,
            job.kind,
            job.attempts_made + 1,
            job.max_attempts
        );

        handler.execute(job).await
    }

    /// Check if a handler is registered for a job kind
    pub fn has_handler(&self, kind: JobKind) -> bool {
        self.handlers.contains_key(&kind)
    }
}
