//! Editing job record and its status state machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::analysis::ContentAnalysis;
use crate::preferences::EditingPreferences;
use crate::transcript::Transcription;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check that the id is a well-formed UUID.
    ///
    /// Job ids come in over the wire; anything that is not a UUID is
    /// rejected before touching the record store.
    pub fn is_valid(&self) -> bool {
        Uuid::parse_str(&self.0).is_ok()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Lifecycle status of an editing job.
///
/// Stored as the row value in the `jobs` table, so the serialized form
/// matches the existing SCREAMING_SNAKE_CASE column values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Job row created, nothing started yet
    #[default]
    Pending,
    /// Raw video upload in progress
    Uploading,
    /// Accepted for processing (signed URL issued or task enqueued)
    Queued,
    /// Transcription stage running
    Transcribing,
    /// Content analysis stage running
    Analyzing,
    /// Handed to the render worker
    Rendering,
    /// Output uploaded, job done
    Completed,
    /// Terminal failure, see error_message
    Failed,
    /// Cancelled before rendering started
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Uploading => "UPLOADING",
            JobStatus::Queued => "QUEUED",
            JobStatus::Transcribing => "TRANSCRIBING",
            JobStatus::Analyzing => "ANALYZING",
            JobStatus::Rendering => "RENDERING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
        }
    }

    /// Terminal states receive no further updates.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// A job may be cancelled only before it reaches the render worker.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            JobStatus::Pending
                | JobStatus::Uploading
                | JobStatus::Queued
                | JobStatus::Transcribing
                | JobStatus::Analyzing
        )
    }

    /// Position of the status in the forward stage order.
    ///
    /// Used to assert that persisted statuses never regress during a
    /// single dispatch run.
    pub fn stage_rank(&self) -> Option<u8> {
        match self {
            JobStatus::Pending => Some(0),
            JobStatus::Uploading => Some(1),
            JobStatus::Queued => Some(2),
            JobStatus::Transcribing => Some(3),
            JobStatus::Analyzing => Some(4),
            JobStatus::Rendering => Some(5),
            JobStatus::Completed => Some(6),
            JobStatus::Failed | JobStatus::Cancelled => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One user-initiated video-editing request and its lifecycle state.
///
/// The record store row is the single source of truth; the orchestrator
/// mutates status/progress/step/payloads, the upload step sets the input
/// path, and the queue worker finalizes queue-dispatched jobs.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Owning user (immutable after creation)
    pub user_id: String,

    /// Current status
    #[serde(default)]
    pub status: JobStatus,

    /// Progress percentage (0-100, non-decreasing while not failed)
    #[serde(default)]
    pub progress_percentage: u8,

    /// Human-readable description of the active stage (display only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,

    /// Object key of the raw upload in the blob store
    pub input_video_path: String,

    /// Object key of the rendered output; set only on COMPLETED
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_video_path: Option<String>,

    /// Public/signed URL of the rendered output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_video_url: Option<String>,

    /// Transcript attached once transcription completes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription: Option<Transcription>,

    /// Content analysis; optional, absence never blocks later stages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ContentAnalysis>,

    /// User editing preferences, attached before rendering begins
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<EditingPreferences>,

    /// Error message; set only on FAILED
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Creation timestamp (immutable)
    pub created_at: DateTime<Utc>,

    /// Completion timestamp; set exactly once on COMPLETED
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a new job in PENDING for a freshly uploaded video.
    pub fn new(user_id: impl Into<String>, input_video_path: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            user_id: user_id.into(),
            status: JobStatus::Pending,
            progress_percentage: 0,
            current_step: None,
            input_video_path: input_video_path.into(),
            output_video_path: None,
            output_video_url: None,
            transcription: None,
            analysis: None,
            preferences: None,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Output key for this job in the processed bucket.
    pub fn output_path(&self) -> String {
        format!("{}/{}/output.mp4", self.user_id, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_validation() {
        assert!(JobId::new().is_valid());
        assert!(JobId::from_string("550e8400-e29b-41d4-a716-446655440000").is_valid());
        assert!(!JobId::from_string("not-a-uuid").is_valid());
        assert!(!JobId::from_string("").is_valid());
    }

    #[test]
    fn status_serializes_to_row_values() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Transcribing).unwrap(),
            "\"TRANSCRIBING\""
        );
        let parsed: JobStatus = serde_json::from_str("\"COMPLETED\"").unwrap();
        assert_eq!(parsed, JobStatus::Completed);
    }

    #[test]
    fn status_terminal_and_cancel_rules() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Rendering.is_terminal());

        assert!(JobStatus::Analyzing.can_cancel());
        assert!(!JobStatus::Rendering.can_cancel());
        assert!(!JobStatus::Completed.can_cancel());
    }

    #[test]
    fn stage_rank_is_strictly_increasing() {
        let order = [
            JobStatus::Pending,
            JobStatus::Uploading,
            JobStatus::Queued,
            JobStatus::Transcribing,
            JobStatus::Analyzing,
            JobStatus::Rendering,
            JobStatus::Completed,
        ];
        let ranks: Vec<u8> = order.iter().map(|s| s.stage_rank().unwrap()).collect();
        assert!(ranks.windows(2).all(|w| w[0] < w[1]));
        assert!(JobStatus::Failed.stage_rank().is_none());
    }

    #[test]
    fn new_job_defaults() {
        let job = Job::new("user-1", "user-1/raw/input.mp4");
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress_percentage, 0);
        assert!(job.output_video_path.is_none());
        assert!(job.error_message.is_none());
        assert!(job.output_path().ends_with("/output.mp4"));
    }
}
