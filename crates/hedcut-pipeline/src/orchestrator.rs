//! Job orchestrator.
//!
//! Drives one job through transcription, analysis, script building and
//! render dispatch, persisting every transition to the jobs table so
//! status reads always reflect the live pipeline. Any stage error marks
//! the job FAILED best-effort before propagating.

use std::time::Duration;

use tracing::{info, info_span, warn, Instrument};

use hedcut_ai::{AiGateway, AiProvider};
use hedcut_models::{EditingScript, Job, JobId, JobStatus, Transcription};
use hedcut_queue::{RenderQueue, RenderTask};
use hedcut_storage::{paths, StorageClient};
use hedcut_supabase::{JobUpdate, JobsRepo, SupabaseError};

use crate::error::{PipelineError, PipelineResult};
use crate::prompt::build_enhanced_prompt;
use crate::render_client::{AsyncRenderRequest, RenderWorkerClient};
use crate::script::build_editing_script;

/// How long presigned input URLs stay valid.
const PRESIGN_TTL: Duration = Duration::from_secs(3600);

/// How the render stage is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Block on the render worker and finish the job in this call.
    SyncRender,
    /// Hand off to the render worker and return while it runs.
    FireAndForget,
    /// Push a render task onto the durable queue for the worker pool.
    Enqueue,
}

/// What `dispatch` left behind.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// Rendered, uploaded, job COMPLETED.
    Completed {
        output_path: String,
        output_url: String,
    },
    /// Handed to the render worker; job is RENDERING.
    Dispatched,
    /// Task queued for the worker pool; job stays QUEUED.
    Enqueued,
}

/// Orchestrates the editing pipeline for one job at a time.
#[derive(Clone)]
pub struct JobPipeline {
    jobs: JobsRepo,
    storage: StorageClient,
    ai: AiGateway,
    render: RenderWorkerClient,
    queue: Option<RenderQueue>,
}

impl JobPipeline {
    pub fn new(
        jobs: JobsRepo,
        storage: StorageClient,
        ai: AiGateway,
        render: RenderWorkerClient,
        queue: Option<RenderQueue>,
    ) -> Self {
        Self {
            jobs,
            storage,
            ai,
            render,
            queue,
        }
    }

    /// Providers the pipeline can transcribe and analyze with.
    pub fn available_services(&self) -> Vec<AiProvider> {
        self.ai.available_services()
    }

    /// Run the pipeline for a job.
    ///
    /// Stage errors mark the job FAILED before propagating, except when
    /// the job does not exist or another run already advanced it.
    pub async fn dispatch(
        &self,
        job_id: &JobId,
        mode: DispatchMode,
    ) -> PipelineResult<DispatchOutcome> {
        let job = match self.jobs.get_job(job_id).await {
            Ok(job) => job,
            Err(SupabaseError::NotFound(_)) => {
                return Err(PipelineError::not_found(format!("job {job_id} not found")))
            }
            Err(e) => return Err(e.into()),
        };

        if self.ai.available_services().is_empty() {
            let err = PipelineError::configuration(
                "no AI service configured; set GROQ_API_KEY or GOOGLE_AI_API_KEY",
            );
            self.persist_failure(job_id, &err).await;
            return Err(err);
        }

        match self
            .run_stages(&job, mode)
            .instrument(info_span!("dispatch", job_id = %job_id))
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if !matches!(
                    e,
                    PipelineError::Supabase(SupabaseError::PreconditionFailed(_))
                ) {
                    self.persist_failure(job_id, &e).await;
                }
                Err(e)
            }
        }
    }

    async fn run_stages(&self, job: &Job, mode: DispatchMode) -> PipelineResult<DispatchOutcome> {
        let job_id = &job.id;

        let video_url = self
            .storage
            .presign_input(&job.input_video_path, PRESIGN_TTL)
            .await?;

        // Claims the job for this run; a concurrent dispatch that already
        // moved the status makes this fail with PreconditionFailed.
        self.jobs
            .update_job_if_status(
                job_id,
                job.status,
                &JobUpdate::new()
                    .status(JobStatus::Queued)
                    .progress(5)
                    .step("Preparing video"),
            )
            .await?;

        self.jobs
            .update_job(
                job_id,
                &JobUpdate::new()
                    .status(JobStatus::Transcribing)
                    .progress(25)
                    .step("Transcribing audio"),
            )
            .await?;

        let video = self.storage.download_input(&job.input_video_path).await?;
        let transcript = match &job.transcription {
            Some(existing) => {
                info!(job_id = %job_id, "reusing stored transcript");
                existing.clone()
            }
            None => {
                let transcript = self.ai.transcribe(&video).await;
                self.jobs
                    .update_job(job_id, &JobUpdate::new().transcription(transcript.clone()))
                    .await?;
                transcript
            }
        };

        self.jobs
            .update_job(
                job_id,
                &JobUpdate::new()
                    .status(JobStatus::Analyzing)
                    .progress(40)
                    .step("Analyzing content"),
            )
            .await?;

        let prefs = job.preferences.clone().unwrap_or_default();
        let analysis = self.analyze(&prefs, &transcript).await;
        if let Some(analysis) = &analysis {
            self.jobs
                .update_job(job_id, &JobUpdate::new().analysis(analysis.clone()))
                .await?;
        }

        let script = build_editing_script(job_id, &prefs, &transcript, analysis.as_ref());
        let issues = script.validate();
        if !issues.is_empty() {
            return Err(PipelineError::script_validation(&issues));
        }

        match mode {
            DispatchMode::SyncRender => self.render_sync(job, video, script).await,
            DispatchMode::FireAndForget => {
                self.render_async(job, video_url, script).await
            }
            DispatchMode::Enqueue => self.enqueue(job, script).await,
        }
    }

    async fn analyze(
        &self,
        prefs: &hedcut_models::EditingPreferences,
        transcript: &Transcription,
    ) -> Option<hedcut_models::ContentAnalysis> {
        let keywords = self.ai.extract_keywords(&transcript.text).await;
        let deep = self.ai.deep_analyze(transcript).await;
        let prompt = build_enhanced_prompt(prefs, transcript, deep.as_ref(), &keywords);
        self.ai.analyze_transcript(transcript, Some(&prompt)).await
    }

    /// Blocking render: wait for the worker, store the output, finish
    /// the job in this call.
    async fn render_sync(
        &self,
        job: &Job,
        video: Vec<u8>,
        script: EditingScript,
    ) -> PipelineResult<DispatchOutcome> {
        let job_id = &job.id;
        self.mark_rendering(job_id).await?;

        let rendered = self.render.process(video, &script).await?;

        self.jobs
            .update_job(
                job_id,
                &JobUpdate::new().progress(80).step("Uploading output"),
            )
            .await?;

        let output_path = paths::output_key(&job.user_id, job_id.as_str());
        self.storage
            .upload_output(rendered, &output_path, "video/mp4")
            .await?;
        let output_url = self.storage.presign_output(&output_path, PRESIGN_TTL).await?;

        self.jobs
            .update_job(
                job_id,
                &JobUpdate::new()
                    .status(JobStatus::Completed)
                    .progress(100)
                    .step("Completed")
                    .output_path(&output_path)
                    .output_url(&output_url)
                    .completed_now(),
            )
            .await?;

        info!(job_id = %job_id, "job completed, output at {}", output_path);
        Ok(DispatchOutcome::Completed {
            output_path,
            output_url,
        })
    }

    /// Hand the job to the render worker and return while it runs. The
    /// supervision task turns a rejected dispatch into a FAILED job
    /// instead of a silent stall.
    async fn render_async(
        &self,
        job: &Job,
        video_url: String,
        script: EditingScript,
    ) -> PipelineResult<DispatchOutcome> {
        let job_id = job.id.clone();
        self.mark_rendering(&job_id).await?;

        let config = self.render.config();
        let request = AsyncRenderRequest {
            job_id: job_id.to_string(),
            video_url,
            output_path: paths::output_key(&job.user_id, job_id.as_str()),
            user_id: job.user_id.clone(),
            editing_script: Some(script),
            groq_api_key: config.groq_api_key.clone(),
            google_api_key: config.google_api_key.clone(),
        };

        let render = self.render.clone();
        let jobs = self.jobs.clone();
        tokio::spawn(
            async move {
                match render.process_async(&request).await {
                    Ok(status) => {
                        info!(job_id = %job_id, "render worker accepted job: {}", status)
                    }
                    Err(e) => {
                        warn!(job_id = %job_id, "async render dispatch failed: {}", e);
                        let update = JobUpdate::new()
                            .status(JobStatus::Failed)
                            .step("Failed")
                            .error(e.to_string());
                        if let Err(persist_err) = jobs.update_job(&job_id, &update).await {
                            warn!(
                                job_id = %job_id,
                                "could not record dispatch failure: {}", persist_err
                            );
                        }
                    }
                }
            }
            .instrument(info_span!("async_render")),
        );

        Ok(DispatchOutcome::Dispatched)
    }

    /// Queue the render for the worker pool. The job stays QUEUED; the
    /// worker moves it to RENDERING when it picks the task up.
    async fn enqueue(&self, job: &Job, script: EditingScript) -> PipelineResult<DispatchOutcome> {
        let queue = self
            .queue
            .as_ref()
            .ok_or_else(|| PipelineError::configuration("render queue not configured"))?;

        let task = RenderTask {
            job_id: job.id.clone(),
            user_id: job.user_id.clone(),
            input_video_path: job.input_video_path.clone(),
            editing_script: script,
        };
        match queue.enqueue_render(&task).await? {
            Some(message_id) => {
                info!(job_id = %job.id, "render task enqueued as {}", message_id)
            }
            None => info!(job_id = %job.id, "render task already queued"),
        }

        self.jobs
            .update_job(
                &job.id,
                &JobUpdate::new().step("Waiting for render worker"),
            )
            .await?;

        Ok(DispatchOutcome::Enqueued)
    }

    async fn mark_rendering(&self, job_id: &JobId) -> PipelineResult<()> {
        self.jobs
            .update_job(
                job_id,
                &JobUpdate::new()
                    .status(JobStatus::Rendering)
                    .progress(50)
                    .step("Rendering video"),
            )
            .await?;
        Ok(())
    }

    /// Best-effort FAILED transition. A persistence failure here is
    /// logged and swallowed so the original error stays visible.
    async fn persist_failure(&self, job_id: &JobId, error: &PipelineError) {
        let update = JobUpdate::new()
            .status(JobStatus::Failed)
            .step("Failed")
            .error(error.to_string());
        if let Err(e) = self.jobs.update_job(job_id, &update).await {
            warn!(job_id = %job_id, "could not mark job failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hedcut_storage::StorageConfig;
    use hedcut_supabase::{RetryConfig, SupabaseClient, SupabaseConfig};
    use wiremock::matchers::{body_string_contains, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // Points every client at the same mock server; paths do not collide
    // (supabase under /rest/v1, storage under /{bucket}, render at /process).
    fn pipeline(uri: &str) -> JobPipeline {
        let supabase = SupabaseClient::new(SupabaseConfig {
            url: uri.to_string(),
            service_role_key: "test-key".to_string(),
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            retry: RetryConfig {
                max_retries: 0,
                base_delay_ms: 1,
                max_delay_ms: 10,
            },
        })
        .unwrap();
        let storage = StorageClient::new(StorageConfig {
            endpoint_url: uri.to_string(),
            access_key_id: "test".to_string(),
            secret_access_key: "test".to_string(),
            uploads_bucket: "videos".to_string(),
            outputs_bucket: "processed-videos".to_string(),
            region: "auto".to_string(),
        });
        let render = RenderWorkerClient::new(crate::render_client::RenderWorkerConfig {
            base_url: uri.to_string(),
            render_timeout: Duration::from_secs(5),
            groq_api_key: None,
            google_api_key: None,
        })
        .unwrap();
        JobPipeline::new(
            JobsRepo::new(supabase),
            storage,
            AiGateway::new(None, None),
            render,
            None,
        )
    }

    #[tokio::test]
    async fn dispatch_unknown_job_is_not_found_without_mutation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/jobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;
        // Any PATCH would violate the no-mutation rule
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/jobs"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let result = pipeline(&server.uri())
            .dispatch(&JobId::new(), DispatchMode::SyncRender)
            .await;
        assert!(matches!(result, Err(PipelineError::NotFound(_))));
    }

    #[tokio::test]
    async fn dispatch_without_ai_services_fails_the_job() {
        let server = MockServer::start().await;
        let job = Job::new("user-1", "user-1/raw/input.mp4");
        Mock::given(method("GET"))
            .and(path("/rest/v1/jobs"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([serde_json::to_value(&job).unwrap()])),
            )
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/jobs"))
            .and(body_string_contains("FAILED"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([serde_json::to_value(&job).unwrap()])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let result = pipeline(&server.uri())
            .dispatch(&job.id, DispatchMode::SyncRender)
            .await;
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[tokio::test]
    async fn enqueue_without_queue_is_a_configuration_error() {
        let server = MockServer::start().await;
        let p = pipeline(&server.uri());
        let job = Job::new("user-1", "user-1/raw/input.mp4");
        let script = EditingScript::new(job.id.as_str());
        let result = p.enqueue(&job, script).await;
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[tokio::test]
    async fn sync_render_uploads_output_and_completes() {
        let server = MockServer::start().await;
        let job = Job::new("user-1", "user-1/raw/input.mp4");

        Mock::given(method("PATCH"))
            .and(path("/rest/v1/jobs"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([serde_json::to_value(&job).unwrap()])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/videos/user-1/raw/input.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8; 32], "video/mp4"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/process"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![9u8; 128], "video/mp4"))
            .mount(&server)
            .await;
        // The rendered bytes must land in the outputs bucket
        Mock::given(method("PUT"))
            .and(path_regex(r"^/processed-videos/user-1/[^/]+/output\.mp4$"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = pipeline(&server.uri())
            .run_stages(&job, DispatchMode::SyncRender)
            .await
            .unwrap();
        match outcome {
            DispatchOutcome::Completed { output_path, .. } => {
                assert_eq!(output_path, format!("user-1/{}/output.mp4", job.id));
            }
            other => panic!("expected Completed, got {other:?}"),
        }
    }
}
