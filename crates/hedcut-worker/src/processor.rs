//! Render task execution.

use std::time::Duration;

use tracing::info;

use hedcut_models::JobStatus;
use hedcut_pipeline::RenderWorkerClient;
use hedcut_queue::RenderTask;
use hedcut_storage::{paths, StorageClient};
use hedcut_supabase::{JobUpdate, JobsRepo, SupabaseClient};

use crate::error::WorkerResult;

const OUTPUT_URL_TTL: Duration = Duration::from_secs(3600);

/// Shared clients for task execution.
pub struct ProcessingContext {
    pub jobs: JobsRepo,
    pub storage: StorageClient,
    pub render: RenderWorkerClient,
}

impl ProcessingContext {
    /// Build all clients from the environment.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            jobs: JobsRepo::new(SupabaseClient::from_env()?),
            storage: StorageClient::from_env()?,
            render: RenderWorkerClient::from_env()?,
        })
    }
}

/// Run one render task end to end: fetch the source, call the render
/// worker, store the output, and finish the job.
pub async fn render_task(ctx: &ProcessingContext, task: &RenderTask) -> WorkerResult<()> {
    let job_id = &task.job_id;
    info!(job_id = %job_id, "Rendering queued task");

    ctx.jobs
        .update_job(
            job_id,
            &JobUpdate::new()
                .status(JobStatus::Rendering)
                .progress(50)
                .step("Rendering video"),
        )
        .await?;

    let video = ctx.storage.download_input(&task.input_video_path).await?;
    let rendered = ctx.render.process(video, &task.editing_script).await?;

    ctx.jobs
        .update_job(
            job_id,
            &JobUpdate::new().progress(80).step("Uploading output"),
        )
        .await?;

    let output_path = paths::output_key(&task.user_id, job_id.as_str());
    ctx.storage
        .upload_output(rendered, &output_path, "video/mp4")
        .await?;
    let output_url = ctx
        .storage
        .presign_output(&output_path, OUTPUT_URL_TTL)
        .await?;

    ctx.jobs
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

    info!(job_id = %job_id, "Task completed, output at {}", output_path);
    Ok(())
}
