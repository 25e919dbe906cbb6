//! Pipeline error types.

use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors surfaced by the job orchestrator and its collaborators.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Editing script rejected: {0}")]
    ScriptValidation(String),

    #[error("Render worker failed: {0}")]
    RenderFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] hedcut_storage::StorageError),

    #[error("Record store error: {0}")]
    Supabase(#[from] hedcut_supabase::SupabaseError),

    #[error("Queue error: {0}")]
    Queue(#[from] hedcut_queue::QueueError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn render_failed(msg: impl Into<String>) -> Self {
        Self::RenderFailed(msg.into())
    }

    pub fn script_validation(issues: &[String]) -> Self {
        Self::ScriptValidation(issues.join("; "))
    }
}
