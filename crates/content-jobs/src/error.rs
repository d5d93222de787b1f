//! Error types for background jobs.

use content_types::ContentError;
use thiserror::Error;

/// Errors a job body can return, or that the registry records on its behalf.
#[derive(Debug, Error)]
pub enum JobError {
    /// Job body reported a failure
    #[error("Job failed: {0}")]
    Failed(String),

    /// Job body panicked
    #[error("Job panicked: {0}")]
    Panicked(String),

    /// Submission happened outside a tokio runtime
    #[error("No tokio runtime available to run the job")]
    NoRuntime,

    /// Content store failure inside the job body
    #[error(transparent)]
    Content(#[from] ContentError),
}
