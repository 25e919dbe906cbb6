//! Repository for the `jobs` table.

use serde_json::{json, Map, Value};
use tracing::debug;

use chrono::{DateTime, Utc};
use hedcut_models::{ContentAnalysis, EditingPreferences, Job, JobId, JobStatus, Transcription};

use crate::client::SupabaseClient;
use crate::error::{SupabaseError, SupabaseResult};
use crate::retry::with_retry;

/// Partial update of a job row. Unset fields are left untouched.
#[derive(Debug, Default, Clone)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress_percentage: Option<u8>,
    pub current_step: Option<String>,
    pub output_video_path: Option<String>,
    pub output_video_url: Option<String>,
    pub transcription: Option<Transcription>,
    pub analysis: Option<ContentAnalysis>,
    pub preferences: Option<EditingPreferences>,
    pub error_message: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn progress(mut self, pct: u8) -> Self {
        self.progress_percentage = Some(pct);
        self
    }

    pub fn step(mut self, step: impl Into<String>) -> Self {
        self.current_step = Some(step.into());
        self
    }

    pub fn output_path(mut self, path: impl Into<String>) -> Self {
        self.output_video_path = Some(path.into());
        self
    }

    pub fn output_url(mut self, url: impl Into<String>) -> Self {
        self.output_video_url = Some(url.into());
        self
    }

    pub fn transcription(mut self, t: Transcription) -> Self {
        self.transcription = Some(t);
        self
    }

    pub fn analysis(mut self, a: ContentAnalysis) -> Self {
        self.analysis = Some(a);
        self
    }

    pub fn preferences(mut self, p: EditingPreferences) -> Self {
        self.preferences = Some(p);
        self
    }

    pub fn error(mut self, msg: impl Into<String>) -> Self {
        self.error_message = Some(msg.into());
        self
    }

    pub fn completed_now(mut self) -> Self {
        self.completed_at = Some(Utc::now());
        self
    }

    /// Serialize only the set fields into a PATCH body.
    pub fn to_patch_body(&self) -> SupabaseResult<Value> {
        let mut body = Map::new();
        if let Some(status) = self.status {
            body.insert("status".to_string(), json!(status));
        }
        if let Some(pct) = self.progress_percentage {
            body.insert("progress_percentage".to_string(), json!(pct));
        }
        if let Some(step) = &self.current_step {
            body.insert("current_step".to_string(), json!(step));
        }
        if let Some(path) = &self.output_video_path {
            body.insert("output_video_path".to_string(), json!(path));
        }
        if let Some(url) = &self.output_video_url {
            body.insert("output_video_url".to_string(), json!(url));
        }
        if let Some(t) = &self.transcription {
            body.insert("transcription".to_string(), serde_json::to_value(t)?);
        }
        if let Some(a) = &self.analysis {
            body.insert("analysis".to_string(), serde_json::to_value(a)?);
        }
        if let Some(p) = &self.preferences {
            body.insert("preferences".to_string(), serde_json::to_value(p)?);
        }
        if let Some(msg) = &self.error_message {
            body.insert("error_message".to_string(), json!(msg));
        }
        if let Some(at) = &self.completed_at {
            body.insert("completed_at".to_string(), json!(at));
        }
        Ok(Value::Object(body))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.to_patch_body(), Ok(Value::Object(m)) if m.is_empty())
    }
}

/// Jobs table access.
#[derive(Clone)]
pub struct JobsRepo {
    client: SupabaseClient,
}

impl JobsRepo {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Insert a new job row.
    pub async fn create_job(&self, job: &Job) -> SupabaseResult<Job> {
        let body = serde_json::to_value(job)?;
        let retry = self.client.retry.clone();
        with_retry(&retry, "create_job", || {
            let body = body.clone();
            async move { self.client.insert("jobs", &body).await }
        })
        .await
    }

    /// Point lookup by id.
    pub async fn get_job(&self, job_id: &JobId) -> SupabaseResult<Job> {
        let query = format!("id=eq.{}&select=*", urlencoding::encode(job_id.as_str()));
        let retry = self.client.retry.clone();
        let rows: Vec<Job> = with_retry(&retry, "get_job", || {
            let query = query.clone();
            async move { self.client.select("jobs", &query).await }
        })
        .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| SupabaseError::not_found(job_id.to_string()))
    }

    /// Apply a partial update unconditionally.
    pub async fn update_job(&self, job_id: &JobId, update: &JobUpdate) -> SupabaseResult<Job> {
        let query = format!("id=eq.{}", urlencoding::encode(job_id.as_str()));
        self.patch_one(job_id, &query, update).await
    }

    /// Apply a partial update only if the row is still in `expected` status.
    ///
    /// PostgREST matches zero rows when the status changed underneath us,
    /// which surfaces here as `PreconditionFailed`. This is the guard that
    /// keeps two dispatch runs from both advancing the same job.
    pub async fn update_job_if_status(
        &self,
        job_id: &JobId,
        expected: JobStatus,
        update: &JobUpdate,
    ) -> SupabaseResult<Job> {
        let query = format!(
            "id=eq.{}&status=eq.{}",
            urlencoding::encode(job_id.as_str()),
            expected.as_str()
        );
        match self.patch_one(job_id, &query, update).await {
            Err(SupabaseError::NotFound(_)) => Err(SupabaseError::precondition_failed(format!(
                "job {job_id} is no longer {expected}"
            ))),
            other => other,
        }
    }

    async fn patch_one(
        &self,
        job_id: &JobId,
        query: &str,
        update: &JobUpdate,
    ) -> SupabaseResult<Job> {
        let body = update.to_patch_body()?;
        debug!("Updating job {}: {}", job_id, body);

        let retry = self.client.retry.clone();
        let rows: Vec<Job> = with_retry(&retry, "update_job", || {
            let body = body.clone();
            async move { self.client.patch("jobs", query, &body).await }
        })
        .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| SupabaseError::not_found(job_id.to_string()))
    }

    /// Cheap probe used by readiness checks.
    pub async fn check_connectivity(&self) -> SupabaseResult<()> {
        let _: Vec<Value> = self.client.select("jobs", "select=id&limit=1").await?;
        Ok(())
    }

    /// List a user's jobs, newest first, optionally filtered by status.
    pub async fn list_jobs(
        &self,
        user_id: &str,
        status: Option<JobStatus>,
        limit: u32,
    ) -> SupabaseResult<Vec<Job>> {
        let mut query = format!(
            "user_id=eq.{}&select=*&order=created_at.desc&limit={}",
            urlencoding::encode(user_id),
            limit
        );
        if let Some(status) = status {
            query.push_str(&format!("&status=eq.{}", status.as_str()));
        }
        let retry = self.client.retry.clone();
        with_retry(&retry, "list_jobs", || {
            let query = query.clone();
            async move { self.client.select("jobs", &query).await }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SupabaseConfig;
    use crate::retry::RetryConfig;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(url: &str) -> SupabaseClient {
        SupabaseClient::new(SupabaseConfig {
            url: url.to_string(),
            service_role_key: "test-key".to_string(),
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            retry: RetryConfig {
                max_retries: 0,
                base_delay_ms: 1,
                max_delay_ms: 10,
            },
        })
        .unwrap()
    }

    fn job_row(id: &JobId) -> serde_json::Value {
        serde_json::to_value(Job {
            id: id.clone(),
            ..Job::new("user-1", "user-1/raw/input.mp4")
        })
        .unwrap()
    }

    #[test]
    fn patch_body_contains_only_set_fields() {
        let update = JobUpdate::new()
            .status(JobStatus::Transcribing)
            .progress(25)
            .step("Transcribing audio");
        let body = update.to_patch_body().unwrap();
        let obj = body.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(obj["status"], "TRANSCRIBING");
        assert_eq!(obj["progress_percentage"], 25);
        assert!(!obj.contains_key("error_message"));
    }

    #[test]
    fn empty_update_is_detected() {
        assert!(JobUpdate::new().is_empty());
        assert!(!JobUpdate::new().progress(5).is_empty());
    }

    #[tokio::test]
    async fn get_job_maps_empty_result_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/jobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let repo = JobsRepo::new(test_client(&server.uri()));
        let result = repo.get_job(&JobId::new()).await;
        assert!(matches!(result, Err(SupabaseError::NotFound(_))));
    }

    #[tokio::test]
    async fn get_job_returns_row() {
        let server = MockServer::start().await;
        let id = JobId::new();
        Mock::given(method("GET"))
            .and(path("/rest/v1/jobs"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([job_row(&id)])),
            )
            .mount(&server)
            .await;

        let repo = JobsRepo::new(test_client(&server.uri()));
        let job = repo.get_job(&id).await.unwrap();
        assert_eq!(job.id, id);
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn conditional_update_reports_precondition_failure() {
        let server = MockServer::start().await;
        let id = JobId::new();
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/jobs"))
            .and(query_param("status", "eq.QUEUED"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let repo = JobsRepo::new(test_client(&server.uri()));
        let result = repo
            .update_job_if_status(
                &id,
                JobStatus::Queued,
                &JobUpdate::new().status(JobStatus::Transcribing),
            )
            .await;
        assert!(matches!(result, Err(SupabaseError::PreconditionFailed(_))));
    }
}
