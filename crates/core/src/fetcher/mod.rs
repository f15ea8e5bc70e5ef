//! Fetch pipeline: resolves program titles into requirement trees.
//!
//! Every title runs its own retry loop on a bounded pool of workers:
//!
//! ```text
//! CREATE_TASK -> VERIFY_ACTIVE -> POLL -> PARSE -> SUCCESS
//!      \______________\____________\_______\____-> RETRY (fresh task) | FAILED
//! ```
//!
//! Results fan in to a single [`FetchOutcome`]; the completion callback fires once,
//! after every title is terminal.

mod config;
mod pipeline;
mod source;
mod task_service;
mod types;

pub use config::{FetchConfig, FetchMode, TaskServiceConfig};
pub use pipeline::{FetchHandle, FetchPipeline, RetryPolicy};
pub use source::{extraction_prompt, CatalogSource, ExtractionSource, ProgramSource};
pub(crate) use source::extract_json_object;
pub use task_service::{HttpTaskService, TaskService, TaskServiceError};
pub use types::{
    FailedFetch, FetchCompleteCallback, FetchOutcome, FetchResult, FetchedProgram, TaskRequest,
    TaskState, TaskStatus,
};

use std::time::Duration;
use thiserror::Error;

/// Errors from a single fetch attempt or from the pipeline itself.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Task creation failed: {0}")]
    TaskCreation(String),

    #[error("Task {task_id} not active (state: {state})")]
    TaskNotActive { task_id: String, state: String },

    #[error("Task {task_id} timed out after {}s", .timeout.as_secs())]
    TaskTimeout { task_id: String, timeout: Duration },

    #[error("Task {0} failed")]
    TaskFailed(String),

    #[error("Failed to parse result: {0}")]
    Parse(String),

    #[error("Program not in catalog: {0}")]
    NotInCatalog(String),

    #[error("Task service error: {0}")]
    Service(#[from] TaskServiceError),

    #[error("No program titles to fetch")]
    NoTitles,

    #[error("Fetch worker failed: {0}")]
    Worker(String),
}

impl FetchError {
    /// Whether another attempt (with a fresh task) could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            FetchError::NotInCatalog(_) | FetchError::NoTitles | FetchError::Worker(_)
        )
    }
}
