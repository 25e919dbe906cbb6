//! Render task payload and lifecycle state.

use serde::{Deserialize, Serialize};

use hedcut_models::{EditingScript, JobId};

/// A render task queued for the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderTask {
    pub job_id: JobId,
    pub user_id: String,
    /// Object key of the raw upload
    pub input_video_path: String,
    /// Validated script to hand to the render worker
    pub editing_script: EditingScript,
}

impl RenderTask {
    /// One task per job; the job id doubles as the idempotency key.
    pub fn idempotency_key(&self) -> &str {
        self.job_id.as_str()
    }
}

/// Queue-side lifecycle of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// On the stream, not yet picked up
    Waiting,
    /// A worker is executing it
    Active,
    /// Scheduled for delayed retry
    Delayed,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Waiting => "waiting",
            TaskState::Active => "active",
            TaskState::Delayed => "delayed",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(TaskState::Waiting),
            "active" => Some(TaskState::Active),
            "delayed" => Some(TaskState::Delayed),
            "completed" => Some(TaskState::Completed),
            "failed" => Some(TaskState::Failed),
            "cancelled" => Some(TaskState::Cancelled),
            _ => None,
        }
    }
}

/// Snapshot of one task's queue status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatus {
    pub job_id: JobId,
    pub state: TaskState,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate queue counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QueueMetrics {
    pub waiting: u64,
    pub active: u64,
    pub delayed: u64,
    pub completed: u64,
    pub failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_state_round_trips() {
        for state in [
            TaskState::Waiting,
            TaskState::Active,
            TaskState::Delayed,
            TaskState::Completed,
            TaskState::Failed,
            TaskState::Cancelled,
        ] {
            assert_eq!(TaskState::parse(state.as_str()), Some(state));
        }
        assert_eq!(TaskState::parse("bogus"), None);
    }

    #[test]
    fn idempotency_key_is_the_job_id() {
        let task = RenderTask {
            job_id: JobId::new(),
            user_id: "u1".to_string(),
            input_video_path: "u1/j1/input.mp4".to_string(),
            editing_script: EditingScript::new("j1"),
        };
        assert_eq!(task.idempotency_key(), task.job_id.as_str());
    }
}
