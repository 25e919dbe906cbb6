//! Task executor.
//!
//! Pulls render tasks from the queue under two ceilings: a semaphore
//! for concurrent tasks and a rate limiter on task starts. Failed
//! attempts go back through the queue's delay schedule; exhausted
//! tasks fail the job.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use metrics::counter;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use hedcut_models::JobStatus;
use hedcut_queue::{RenderQueue, RenderTask, RetryDecision};
use hedcut_supabase::JobUpdate;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::processor::{render_task, ProcessingContext};

type StartLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Executor that drains the render queue.
pub struct TaskExecutor {
    config: WorkerConfig,
    queue: Arc<RenderQueue>,
    semaphore: Arc<Semaphore>,
    starts: Arc<StartLimiter>,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl TaskExecutor {
    /// Create a new task executor.
    pub fn new(config: WorkerConfig, queue: RenderQueue) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_tasks));
        let starts_per_window =
            NonZeroU32::new(config.max_starts_per_window).unwrap_or(NonZeroU32::new(10).unwrap());
        let quota = Quota::with_period(config.starts_window / starts_per_window.get())
            .unwrap_or_else(|| Quota::per_minute(starts_per_window))
            .allow_burst(starts_per_window);
        let (shutdown, _) = tokio::sync::watch::channel(false);

        Self {
            config,
            queue: Arc::new(queue),
            semaphore,
            starts: Arc::new(RateLimiter::direct(quota)),
            shutdown,
            consumer_name: format!("worker-{}", Uuid::new_v4()),
        }
    }

    /// Start the executor.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting task executor '{}' with {} slots, {} starts per {:?}",
            self.consumer_name,
            self.config.max_concurrent_tasks,
            self.config.max_starts_per_window,
            self.config.starts_window
        );

        self.queue.init().await?;

        let ctx = Arc::new(
            ProcessingContext::from_env()
                .map_err(|e| WorkerError::config_error(e.to_string()))?,
        );

        let maintenance_task = self.spawn_maintenance();
        let claim_task = self.spawn_claimer(Arc::clone(&ctx));

        let mut shutdown_rx = self.shutdown.subscribe();
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_tasks(&ctx) => {
                    if let Err(e) = result {
                        error!("Error consuming tasks: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        maintenance_task.abort();
        claim_task.abort();

        info!("Waiting for in-flight tasks to finish...");
        let _ = tokio::time::timeout(self.config.shutdown_timeout, self.drain()).await;
        self.queue.close().await.ok();

        info!("Task executor stopped");
        Ok(())
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Background loop that promotes due delayed tasks and expires old
    /// terminal records.
    fn spawn_maintenance(&self) -> tokio::task::JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let promote_interval = self.config.promote_interval;
        let clean_interval = self.config.clean_interval;
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut promote = tokio::time::interval(promote_interval);
            let mut clean = tokio::time::interval(clean_interval);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = promote.tick() => {
                        match queue.promote_due().await {
                            Ok(0) => {}
                            Ok(n) => debug!("Promoted {} delayed tasks", n),
                            Err(e) => warn!("Failed to promote delayed tasks: {}", e),
                        }
                    }
                    _ = clean.tick() => {
                        if let Err(e) = queue.clean_old_tasks().await {
                            warn!("Failed to clean old task records: {}", e);
                        }
                    }
                }
            }
        })
    }

    /// Background loop that claims tasks stranded by crashed workers.
    fn spawn_claimer(&self, ctx: Arc<ProcessingContext>) -> tokio::task::JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let semaphore = Arc::clone(&self.semaphore);
        let starts = Arc::clone(&self.starts);
        let consumer_name = self.consumer_name.clone();
        let claim_interval = self.config.claim_interval;
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(claim_interval);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        match queue.claim_pending(&consumer_name, 5).await {
                            Ok(tasks) if !tasks.is_empty() => {
                                info!("Claimed {} stale tasks", tasks.len());
                                for (message_id, task) in tasks {
                                    let Ok(permit) =
                                        Arc::clone(&semaphore).acquire_owned().await
                                    else {
                                        return;
                                    };
                                    starts.until_ready().await;
                                    let ctx = Arc::clone(&ctx);
                                    let queue = Arc::clone(&queue);
                                    tokio::spawn(async move {
                                        let _permit = permit;
                                        Self::execute_task(ctx, queue, message_id, task).await;
                                    });
                                }
                            }
                            Ok(_) => {}
                            Err(e) => warn!("Failed to claim pending tasks: {}", e),
                        }
                    }
                }
            }
        })
    }

    /// Consume and execute tasks from the queue.
    async fn consume_tasks(&self, ctx: &Arc<ProcessingContext>) -> WorkerResult<()> {
        let available = self.semaphore.available_permits();
        if available == 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let tasks = self
            .queue
            .consume(&self.consumer_name, 1000, available.min(5))
            .await?;

        for (message_id, task) in tasks {
            let permit = Arc::clone(&self.semaphore)
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::task_failed("semaphore closed"))?;
            self.starts.until_ready().await;

            let ctx = Arc::clone(ctx);
            let queue = Arc::clone(&self.queue);
            tokio::spawn(async move {
                let _permit = permit;
                Self::execute_task(ctx, queue, message_id, task).await;
            });
        }

        Ok(())
    }

    /// Execute a single task with retry bookkeeping.
    async fn execute_task(
        ctx: Arc<ProcessingContext>,
        queue: Arc<RenderQueue>,
        message_id: String,
        task: RenderTask,
    ) {
        let job_id = task.job_id.clone();

        match render_task(&ctx, &task).await {
            Ok(()) => {
                counter!("hedcut_worker_tasks_completed_total").increment(1);
                if let Err(e) = queue.complete(&job_id, &message_id).await {
                    error!(job_id = %job_id, "Failed to mark task completed: {}", e);
                }
            }
            Err(e) => {
                error!(job_id = %job_id, "Task failed: {}", e);
                counter!("hedcut_worker_tasks_failed_total").increment(1);

                let decision = queue
                    .fail_attempt(&task, &message_id, &e.to_string(), e.is_retryable())
                    .await;
                match decision {
                    Ok(RetryDecision::Scheduled { attempt, delay_ms }) => {
                        info!(
                            job_id = %job_id,
                            "Retry {} scheduled in {}ms", attempt, delay_ms
                        );
                        let update = JobUpdate::new().step("Retrying render");
                        if let Err(e) = ctx.jobs.update_job(&job_id, &update).await {
                            warn!(job_id = %job_id, "Could not record retry step: {}", e);
                        }
                    }
                    Ok(RetryDecision::Exhausted) => {
                        let update = JobUpdate::new()
                            .status(JobStatus::Failed)
                            .step("Failed")
                            .error(e.to_string());
                        if let Err(persist_err) = ctx.jobs.update_job(&job_id, &update).await {
                            error!(
                                job_id = %job_id,
                                "Could not mark job failed: {}", persist_err
                            );
                        }
                    }
                    Err(queue_err) => {
                        error!(
                            job_id = %job_id,
                            "Failed to record task failure: {}", queue_err
                        );
                    }
                }
            }
        }
    }

    /// Wait for all in-flight tasks to finish.
    async fn drain(&self) {
        loop {
            if self.semaphore.available_permits() == self.config.max_concurrent_tasks {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
