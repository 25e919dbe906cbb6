//! Worker error types.

use thiserror::Error;

use hedcut_pipeline::PipelineError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Task failed: {0}")]
    TaskFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    Storage(#[from] hedcut_storage::StorageError),

    #[error("Record store error: {0}")]
    Supabase(#[from] hedcut_supabase::SupabaseError),

    #[error("Render error: {0}")]
    Render(#[from] PipelineError),

    #[error("Queue error: {0}")]
    Queue(#[from] hedcut_queue::QueueError),
}

impl WorkerError {
    pub fn task_failed(msg: impl Into<String>) -> Self {
        Self::TaskFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Transient errors earn another attempt; a rejected script or bad
    /// configuration will fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Storage(_) | WorkerError::Supabase(_) => true,
            WorkerError::Render(e) => matches!(
                e,
                PipelineError::Network(_) | PipelineError::RenderFailed(_)
            ),
            WorkerError::TaskFailed(_) | WorkerError::ConfigError(_) | WorkerError::Queue(_) => {
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_network_errors_are_retryable() {
        let err = WorkerError::Render(PipelineError::render_failed("HTTP 503: busy"));
        assert!(err.is_retryable());
    }

    #[test]
    fn script_rejection_is_not_retryable() {
        let err =
            WorkerError::Render(PipelineError::script_validation(&["bad span".to_string()]));
        assert!(!err.is_retryable());
        assert!(!WorkerError::config_error("missing env").is_retryable());
    }
}
