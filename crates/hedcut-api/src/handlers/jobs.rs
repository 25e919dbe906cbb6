//! Job dispatch and read handlers.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use hedcut_models::{sanitize_input, EditingPreferences, FileUpload, Job, JobId, JobStatus};
use hedcut_pipeline::{DispatchMode, DispatchOutcome};
use hedcut_storage::paths;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub filename: String,
    #[serde(rename = "contentType")]
    pub content_type: String,
    pub size: u64,
    pub preferences: Option<EditingPreferences>,
}

#[derive(Serialize)]
pub struct CreateJobResponse {
    #[serde(rename = "jobId")]
    pub job_id: String,
    #[serde(rename = "uploadPath")]
    pub upload_path: String,
    pub status: JobStatus,
}

fn file_extension(filename: &str) -> &str {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
        .unwrap_or("mp4")
}

/// `POST /api/jobs` - create a PENDING job for an upload.
///
/// Validates the declared file metadata before any row exists and
/// returns the object key the client must upload the video to.
pub async fn create_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateJobRequest>,
) -> ApiResult<Json<CreateJobResponse>> {
    let user_id = caller_id(&headers)?;

    let upload = FileUpload {
        filename: body.filename.clone(),
        content_type: body.content_type.clone(),
        size: body.size,
    };
    let issues = upload.validate();
    if !issues.is_empty() {
        return Err(ApiError::bad_request(issues.join("; ")));
    }

    let mut preferences = body.preferences;
    if let Some(prefs) = &mut preferences {
        // Free text goes to AI prompts later; strip template characters now
        if let Some(prompt) = prefs.custom_prompt.take() {
            let cleaned = sanitize_input(&prompt);
            prefs.custom_prompt = (!cleaned.is_empty()).then_some(cleaned);
        }
    }

    let mut job = Job::new(&user_id, String::new());
    job.input_video_path = paths::input_key(
        &user_id,
        job.id.as_str(),
        file_extension(&body.filename),
    );
    job.preferences = preferences;

    let created = state.jobs.create_job(&job).await?;
    info!(job_id = %created.id, "Created job for upload {}", created.input_video_path);

    Ok(Json(CreateJobResponse {
        job_id: created.id.to_string(),
        upload_path: created.input_video_path,
        status: created.status,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    #[serde(rename = "jobId")]
    pub job_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessQuery {
    pub mode: Option<String>,
}

#[derive(Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub status: JobStatus,
    #[serde(rename = "jobId")]
    pub job_id: String,
    pub message: String,
    #[serde(rename = "servicesUsed", skip_serializing_if = "Option::is_none")]
    pub services_used: Option<Vec<String>>,
}

/// `POST /api/jobs/process` - run the editing pipeline for a job.
///
/// Defaults to fire-and-forget render dispatch. `?mode=sync` blocks on
/// the render worker; `?mode=queue` pushes a durable task when a queue
/// is configured.
pub async fn process_job(
    State(state): State<AppState>,
    Query(query): Query<ProcessQuery>,
    Json(body): Json<ProcessRequest>,
) -> ApiResult<Json<ProcessResponse>> {
    let job_id = match body.job_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => JobId::from_string(id),
        _ => return Err(ApiError::bad_request("jobId is required")),
    };
    if !job_id.is_valid() {
        return Err(ApiError::bad_request("jobId must be a UUID"));
    }

    let mode = match query.mode.as_deref() {
        Some("sync") => DispatchMode::SyncRender,
        Some("queue") if state.queue_configured => DispatchMode::Enqueue,
        Some("queue") => {
            warn!(job_id = %job_id, "queue mode requested without REDIS_URL, using async dispatch");
            DispatchMode::FireAndForget
        }
        _ => DispatchMode::FireAndForget,
    };

    info!(job_id = %job_id, ?mode, "Dispatching job");
    let services_used: Vec<String> = state
        .pipeline
        .available_services()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let dispatch = state.pipeline.dispatch(&job_id, mode);
    let outcome = if mode == DispatchMode::SyncRender {
        match tokio::time::timeout(state.config.max_dispatch_duration, dispatch).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                metrics::record_job_failed();
                return Err(e.into());
            }
            Err(_) => {
                metrics::record_job_failed();
                // The cancelled dispatch never reached its own failure
                // persistence, so record the timeout here.
                let update = hedcut_supabase::JobUpdate::new()
                    .status(JobStatus::Failed)
                    .step("Failed")
                    .error("synchronous dispatch timed out");
                if let Err(e) = state.jobs.update_job(&job_id, &update).await {
                    warn!(job_id = %job_id, "could not mark timed-out job failed: {}", e);
                }
                return Err(ApiError::internal("synchronous dispatch timed out"));
            }
        }
    } else {
        match dispatch.await {
            Ok(outcome) => outcome,
            Err(e) => {
                metrics::record_job_failed();
                return Err(e.into());
            }
        }
    };

    metrics::record_job_dispatched();

    let (status, message) = match &outcome {
        DispatchOutcome::Completed { .. } => {
            (JobStatus::Completed, "Video processed successfully")
        }
        DispatchOutcome::Dispatched => (JobStatus::Rendering, "Video processing started"),
        DispatchOutcome::Enqueued => (JobStatus::Queued, "Video queued for processing"),
    };

    Ok(Json(ProcessResponse {
        success: true,
        status,
        job_id: job_id.to_string(),
        message: message.to_string(),
        services_used: if services_used.is_empty() {
            None
        } else {
            Some(services_used)
        },
    }))
}

/// Caller identity from the `x-user-id` header set by the auth proxy.
fn caller_id(headers: &HeaderMap) -> ApiResult<String> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::unauthorized("x-user-id header required"))
}

/// `GET /api/jobs/:job_id` - fetch one job, owner only.
///
/// A job owned by someone else reads as missing so ids cannot be probed.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Job>> {
    let user_id = caller_id(&headers)?;
    let job_id = JobId::from_string(job_id);
    if !job_id.is_valid() {
        return Err(ApiError::bad_request("job id must be a UUID"));
    }

    let job = state.jobs.get_job(&job_id).await?;
    if job.user_id != user_id {
        return Err(ApiError::not_found(job_id.to_string()));
    }
    Ok(Json(job))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<JobStatus>,
    pub limit: Option<u32>,
}

#[derive(Serialize)]
pub struct ListResponse {
    pub jobs: Vec<Job>,
}

/// `GET /api/jobs` - the caller's jobs, newest first.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> ApiResult<Json<ListResponse>> {
    let user_id = caller_id(&headers)?;
    let limit = query.limit.unwrap_or(50).min(100);

    let jobs = state.jobs.list_jobs(&user_id, query.status, limit).await?;
    Ok(Json(ListResponse { jobs }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_id_requires_header() {
        let headers = HeaderMap::new();
        assert!(matches!(
            caller_id(&headers),
            Err(ApiError::Unauthorized(_))
        ));

        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", "user-1".parse().unwrap());
        assert_eq!(caller_id(&headers).unwrap(), "user-1");
    }

    #[test]
    fn file_extension_falls_back_to_mp4() {
        assert_eq!(file_extension("clip.mov"), "mov");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension("noext"), "mp4");
        assert_eq!(file_extension("trailing."), "mp4");
    }

    #[test]
    fn process_request_parses_wire_field() {
        let body: ProcessRequest =
            serde_json::from_str(r#"{"jobId": "abc"}"#).unwrap();
        assert_eq!(body.job_id.as_deref(), Some("abc"));

        let body: ProcessRequest = serde_json::from_str("{}").unwrap();
        assert!(body.job_id.is_none());
    }
}
