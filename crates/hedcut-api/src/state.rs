//! Application state.

use std::sync::Arc;

use tracing::info;

use hedcut_ai::AiGateway;
use hedcut_pipeline::{JobPipeline, RenderWorkerClient};
use hedcut_queue::RenderQueue;
use hedcut_storage::StorageClient;
use hedcut_supabase::{JobsRepo, SupabaseClient};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub jobs: JobsRepo,
    pub storage: Arc<StorageClient>,
    pub pipeline: JobPipeline,
    /// Set when REDIS_URL is configured; enables `?mode=queue`.
    pub queue_configured: bool,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let supabase = SupabaseClient::from_env()?;
        let jobs = JobsRepo::new(supabase);
        let storage = StorageClient::from_env()?;
        let ai = AiGateway::from_env();
        let render = RenderWorkerClient::from_env()?;

        let queue = match std::env::var("REDIS_URL") {
            Ok(_) => {
                let queue = RenderQueue::from_env()?;
                queue.init().await?;
                info!("Render queue configured");
                Some(queue)
            }
            Err(_) => None,
        };
        let queue_configured = queue.is_some();

        let pipeline = JobPipeline::new(jobs.clone(), storage.clone(), ai, render, queue);

        Ok(Self {
            config,
            jobs,
            storage: Arc::new(storage),
            pipeline,
            queue_configured,
        })
    }
}
