//! Render queue on Redis Streams with a sorted-set delay schedule.
//!
//! Tasks live on a stream consumed through a consumer group. Failed
//! attempts are parked in a sorted set scored by their delivery time
//! and promoted back onto the stream once due, which is how delayed
//! exponential backoff works without a scheduler process.

use std::time::Duration;

use chrono::Utc;
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use hedcut_models::JobId;

use crate::error::{QueueError, QueueResult};
use crate::task::{QueueMetrics, RenderTask, TaskState, TaskStatus};

/// Attempts per task before it lands in the failed set.
pub const MAX_ATTEMPTS: u32 = 3;
/// First retry delay; doubles per attempt.
pub const BASE_BACKOFF_MS: u64 = 2000;
/// Completed task records are kept for a day.
pub const COMPLETED_RETENTION_SECS: i64 = 24 * 3600;
/// Failed task records are kept for a week.
pub const FAILED_RETENTION_SECS: i64 = 7 * 24 * 3600;

const DEDUP_TTL_SECS: u64 = 3600;

/// Outcome of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Parked for delayed redelivery.
    Scheduled { attempt: u32, delay_ms: u64 },
    /// Out of attempts; task is in the failed set.
    Exhausted,
}

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream name for render tasks
    pub stream_name: String,
    /// Consumer group name
    pub consumer_group: String,
    /// Max attempts before the failed set
    pub max_attempts: u32,
    /// Task visibility timeout
    pub visibility_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "hedcut:render".to_string(),
            consumer_group: "hedcut:workers".to_string(),
            max_attempts: MAX_ATTEMPTS,
            visibility_timeout: Duration::from_secs(600),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            stream_name: std::env::var("QUEUE_STREAM")
                .unwrap_or_else(|_| "hedcut:render".to_string()),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or_else(|_| "hedcut:workers".to_string()),
            max_attempts: std::env::var("QUEUE_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_ATTEMPTS),
            visibility_timeout: Duration::from_secs(
                std::env::var("QUEUE_VISIBILITY_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
        }
    }
}

/// Render queue client.
#[derive(Clone)]
pub struct RenderQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl RenderQueue {
    /// Create a new render queue.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    /// Initialize the queue (create consumer group if not exists).
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!(
                    "Consumer group already exists: {}",
                    self.config.consumer_group
                );
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    fn task_key(job_id: &str) -> String {
        format!("hedcut:task:{job_id}")
    }

    fn dedup_key(job_id: &str) -> String {
        format!("hedcut:dedup:{job_id}")
    }

    const DELAYED_ZSET: &'static str = "hedcut:delayed";
    const COMPLETED_ZSET: &'static str = "hedcut:completed";
    const FAILED_ZSET: &'static str = "hedcut:failed";
    const ACTIVE_SET: &'static str = "hedcut:active";

    /// Enqueue a render task. Idempotent per job id: a task already
    /// queued (dedup key live) returns `Ok(None)` without a second add.
    pub async fn enqueue_render(&self, task: &RenderTask) -> QueueResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let dedup_key = Self::dedup_key(task.idempotency_key());
        let fresh: bool = redis::cmd("SET")
            .arg(&dedup_key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(DEDUP_TTL_SECS)
            .query_async::<Option<String>>(&mut conn)
            .await?
            .is_some();
        if !fresh {
            info!("Task for job {} already queued, skipping", task.job_id);
            return Ok(None);
        }

        let payload = serde_json::to_string(task)?;

        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("task")
            .arg(&payload)
            .query_async(&mut conn)
            .await?;

        let now = Utc::now().timestamp_millis();
        redis::cmd("HSET")
            .arg(Self::task_key(task.job_id.as_str()))
            .arg("state")
            .arg(TaskState::Waiting.as_str())
            .arg("attempts")
            .arg(0)
            .arg("payload")
            .arg(&payload)
            .arg("updated_at")
            .arg(now)
            .query_async::<()>(&mut conn)
            .await?;

        info!(
            "Enqueued render task for job {} with message ID {}",
            task.job_id, message_id
        );
        Ok(Some(message_id))
    }

    /// Move due delayed tasks back onto the stream. Returns how many
    /// were promoted. Run periodically by the worker loop.
    pub async fn promote_due(&self) -> QueueResult<u32> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let now = Utc::now().timestamp_millis();
        let due: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(Self::DELAYED_ZSET)
            .arg("-inf")
            .arg(now)
            .query_async(&mut conn)
            .await?;

        let mut promoted = 0;
        for payload in due {
            let removed: u32 = conn.zrem(Self::DELAYED_ZSET, &payload).await?;
            if removed == 0 {
                // Another promoter got it first
                continue;
            }

            redis::cmd("XADD")
                .arg(&self.config.stream_name)
                .arg("*")
                .arg("task")
                .arg(&payload)
                .query_async::<String>(&mut conn)
                .await?;

            if let Ok(task) = serde_json::from_str::<RenderTask>(&payload) {
                self.set_state(&mut conn, task.job_id.as_str(), TaskState::Waiting, None)
                    .await?;
                debug!("Promoted delayed task for job {}", task.job_id);
            }
            promoted += 1;
        }

        Ok(promoted)
    }

    /// Consume tasks from the stream. Cancelled tasks are acked and
    /// skipped here so workers never see them. Each delivery counts as
    /// one attempt.
    pub async fn consume(
        &self,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, RenderTask)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        let mut tasks = Vec::new();

        for stream_key in result.keys {
            for entry in stream_key.ids {
                let message_id = entry.id.clone();

                let Some(redis::Value::BulkString(payload)) = entry.map.get("task") else {
                    continue;
                };
                let payload_str = String::from_utf8_lossy(payload);
                let task = match serde_json::from_str::<RenderTask>(&payload_str) {
                    Ok(task) => task,
                    Err(e) => {
                        warn!("Failed to parse task payload: {}", e);
                        // Ack the malformed message to prevent reprocessing
                        self.ack(&message_id).await.ok();
                        continue;
                    }
                };

                let state: Option<String> = conn
                    .hget(Self::task_key(task.job_id.as_str()), "state")
                    .await?;
                if state.as_deref() == Some(TaskState::Cancelled.as_str()) {
                    debug!("Skipping cancelled task for job {}", task.job_id);
                    self.ack(&message_id).await.ok();
                    continue;
                }

                let attempt = self.activate(&mut conn, task.job_id.as_str()).await?;

                debug!(
                    "Consumed render task for job {} (attempt {})",
                    task.job_id, attempt
                );
                tasks.push((message_id, task));
            }
        }

        Ok(tasks)
    }

    /// Claim pending tasks idle past the visibility timeout, picking up
    /// after crashed workers.
    pub async fn claim_pending(
        &self,
        consumer_name: &str,
        count: usize,
    ) -> QueueResult<Vec<(String, RenderTask)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let pending: redis::streams::StreamPendingReply = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .query_async(&mut conn)
            .await?;

        if pending.count() == 0 {
            return Ok(Vec::new());
        }

        let result: redis::streams::StreamClaimReply = redis::cmd("XCLAIM")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(self.config.visibility_timeout.as_millis() as u64)
            .arg("0-0")
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        let mut tasks = Vec::new();
        for entry in result.ids {
            let message_id = entry.id.clone();
            if let Some(redis::Value::BulkString(payload)) = entry.map.get("task") {
                let payload_str = String::from_utf8_lossy(payload);
                match serde_json::from_str::<RenderTask>(&payload_str) {
                    Ok(task) => {
                        // A claim re-executes the task, so it counts too
                        let attempt = self.activate(&mut conn, task.job_id.as_str()).await?;
                        info!(
                            "Claimed stale task for job {} (attempt {})",
                            task.job_id, attempt
                        );
                        tasks.push((message_id, task));
                    }
                    Err(e) => {
                        warn!("Failed to parse claimed task payload: {}", e);
                        self.ack(&message_id).await.ok();
                    }
                }
            }
        }

        Ok(tasks)
    }

    /// Acknowledge and drop a stream message.
    pub async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        Ok(())
    }

    /// Mark a task completed and schedule its record for expiry.
    pub async fn complete(&self, job_id: &JobId, message_id: &str) -> QueueResult<()> {
        self.ack(message_id).await?;

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.srem::<_, _, ()>(Self::ACTIVE_SET, job_id.as_str())
            .await?;
        self.set_state(&mut conn, job_id.as_str(), TaskState::Completed, None)
            .await?;
        conn.zadd::<_, _, _, ()>(
            Self::COMPLETED_ZSET,
            job_id.as_str(),
            Utc::now().timestamp_millis(),
        )
        .await?;
        conn.del::<_, ()>(Self::dedup_key(job_id.as_str())).await?;

        info!("Render task for job {} completed", job_id);
        Ok(())
    }

    /// Settle a failed attempt: either park the task for delayed retry
    /// with doubled backoff, or move it to the failed set when attempts
    /// are exhausted. The attempt itself was counted at delivery time.
    /// Pass `retryable = false` to skip the schedule and fail the task
    /// outright.
    pub async fn fail_attempt(
        &self,
        task: &RenderTask,
        message_id: &str,
        error: &str,
        retryable: bool,
    ) -> QueueResult<RetryDecision> {
        self.ack(message_id).await?;

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let job_id = task.job_id.as_str();
        conn.srem::<_, _, ()>(Self::ACTIVE_SET, job_id).await?;

        let attempts: u32 = conn
            .hget::<_, _, Option<u32>>(Self::task_key(job_id), "attempts")
            .await?
            .unwrap_or(1)
            .max(1);

        if retryable && attempts < self.config.max_attempts {
            let delay_ms = BASE_BACKOFF_MS.saturating_mul(2u64.pow(attempts - 1));
            let deliver_at = Utc::now().timestamp_millis() + delay_ms as i64;
            let payload = serde_json::to_string(task)?;

            conn.zadd::<_, _, _, ()>(Self::DELAYED_ZSET, &payload, deliver_at)
                .await?;
            self.set_state(&mut conn, job_id, TaskState::Delayed, Some(error))
                .await?;

            warn!(
                "Render attempt {}/{} for job {} failed, retrying in {}ms: {}",
                attempts, self.config.max_attempts, job_id, delay_ms, error
            );
            Ok(RetryDecision::Scheduled {
                attempt: attempts,
                delay_ms,
            })
        } else {
            self.set_state(&mut conn, job_id, TaskState::Failed, Some(error))
                .await?;
            conn.zadd::<_, _, _, ()>(
                Self::FAILED_ZSET,
                job_id,
                Utc::now().timestamp_millis(),
            )
            .await?;
            conn.del::<_, ()>(Self::dedup_key(job_id)).await?;

            warn!(
                "Render task for job {} exhausted {} attempts: {}",
                job_id, self.config.max_attempts, error
            );
            Ok(RetryDecision::Exhausted)
        }
    }

    /// Queue-side status of one task.
    pub async fn task_status(&self, job_id: &JobId) -> QueueResult<TaskStatus> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (state, attempts, error): (Option<String>, Option<u32>, Option<String>) =
            redis::cmd("HMGET")
                .arg(Self::task_key(job_id.as_str()))
                .arg("state")
                .arg("attempts")
                .arg("error")
                .query_async(&mut conn)
                .await?;

        let state = state
            .as_deref()
            .and_then(TaskState::parse)
            .ok_or_else(|| QueueError::task_not_found(job_id.to_string()))?;

        Ok(TaskStatus {
            job_id: job_id.clone(),
            state,
            attempts: attempts.unwrap_or(0),
            error,
        })
    }

    /// Cancel a task that has not started executing.
    pub async fn cancel(&self, job_id: &JobId) -> QueueResult<()> {
        let status = self.task_status(job_id).await?;
        match status.state {
            TaskState::Waiting | TaskState::Delayed => {}
            other => {
                return Err(QueueError::invalid_state(format!(
                    "cannot cancel task for job {} in state {}",
                    job_id,
                    other.as_str()
                )))
            }
        }

        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // Delayed copy (if any) must not come back
        if let Some(payload) = conn
            .hget::<_, _, Option<String>>(Self::task_key(job_id.as_str()), "payload")
            .await?
        {
            conn.zrem::<_, _, ()>(Self::DELAYED_ZSET, &payload).await?;
        }

        self.set_state(&mut conn, job_id.as_str(), TaskState::Cancelled, None)
            .await?;
        conn.del::<_, ()>(Self::dedup_key(job_id.as_str())).await?;

        info!("Cancelled render task for job {}", job_id);
        Ok(())
    }

    /// Re-enqueue a task from the failed set with a fresh attempt budget.
    pub async fn retry(&self, job_id: &JobId) -> QueueResult<String> {
        let status = self.task_status(job_id).await?;
        if status.state != TaskState::Failed {
            return Err(QueueError::invalid_state(format!(
                "cannot retry task for job {} in state {}",
                job_id,
                status.state.as_str()
            )));
        }

        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload: String = conn
            .hget::<_, _, Option<String>>(Self::task_key(job_id.as_str()), "payload")
            .await?
            .ok_or_else(|| QueueError::task_not_found(job_id.to_string()))?;

        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("task")
            .arg(&payload)
            .query_async(&mut conn)
            .await?;

        conn.zrem::<_, _, ()>(Self::FAILED_ZSET, job_id.as_str())
            .await?;
        redis::cmd("HSET")
            .arg(Self::task_key(job_id.as_str()))
            .arg("state")
            .arg(TaskState::Waiting.as_str())
            .arg("attempts")
            .arg(0)
            .arg("updated_at")
            .arg(Utc::now().timestamp_millis())
            .query_async::<()>(&mut conn)
            .await?;

        info!("Retrying render task for job {}", job_id);
        Ok(message_id)
    }

    /// Aggregate counters across the queue.
    pub async fn metrics(&self) -> QueueResult<QueueMetrics> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let waiting: u64 = conn.xlen(&self.config.stream_name).await?;
        let active: u64 = conn.scard(Self::ACTIVE_SET).await?;
        let delayed: u64 = conn.zcard(Self::DELAYED_ZSET).await?;
        let completed: u64 = conn.zcard(Self::COMPLETED_ZSET).await?;
        let failed: u64 = conn.zcard(Self::FAILED_ZSET).await?;

        Ok(QueueMetrics {
            waiting,
            active,
            delayed,
            completed,
            failed,
        })
    }

    /// Drop completed records older than a day and failed records older
    /// than a week. Returns how many records were removed.
    pub async fn clean_old_tasks(&self) -> QueueResult<u32> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let now = Utc::now().timestamp_millis();

        let mut removed = 0;
        for (zset, retention_secs) in [
            (Self::COMPLETED_ZSET, COMPLETED_RETENTION_SECS),
            (Self::FAILED_ZSET, FAILED_RETENTION_SECS),
        ] {
            let cutoff = now - retention_secs * 1000;
            let old: Vec<String> = redis::cmd("ZRANGEBYSCORE")
                .arg(zset)
                .arg("-inf")
                .arg(cutoff)
                .query_async(&mut conn)
                .await?;

            for job_id in &old {
                conn.del::<_, ()>(Self::task_key(job_id)).await?;
                conn.zrem::<_, _, ()>(zset, job_id).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            info!("Cleaned {} old task records", removed);
        }
        Ok(removed)
    }

    /// Final connectivity flush before shutdown.
    pub async fn close(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        info!("Render queue connections closed");
        Ok(())
    }

    /// Max attempts from config.
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Mark a task active and count the delivery. A task that succeeds
    /// on its third delivery ends with exactly three attempts recorded.
    async fn activate(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        job_id: &str,
    ) -> QueueResult<u32> {
        conn.sadd::<_, _, ()>(Self::ACTIVE_SET, job_id).await?;
        let attempts: u32 = conn.hincr(Self::task_key(job_id), "attempts", 1).await?;
        self.set_state(conn, job_id, TaskState::Active, None).await?;
        Ok(attempts)
    }

    async fn set_state(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        job_id: &str,
        state: TaskState,
        error: Option<&str>,
    ) -> QueueResult<()> {
        let mut cmd = redis::cmd("HSET");
        cmd.arg(Self::task_key(job_id))
            .arg("state")
            .arg(state.as_str())
            .arg("updated_at")
            .arg(Utc::now().timestamp_millis());
        if let Some(error) = error {
            cmd.arg("error").arg(error);
        }
        cmd.query_async::<()>(conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        // First retry after attempt 1, second after attempt 2
        let delays: Vec<u64> = (1..MAX_ATTEMPTS)
            .map(|attempt| BASE_BACKOFF_MS.saturating_mul(2u64.pow(attempt - 1)))
            .collect();
        assert_eq!(delays, vec![2000, 4000]);
    }

    #[test]
    fn retention_windows() {
        assert_eq!(COMPLETED_RETENTION_SECS, 86_400);
        assert_eq!(FAILED_RETENTION_SECS, 604_800);
    }

    #[test]
    fn config_defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.stream_name, "hedcut:render");
    }
}
