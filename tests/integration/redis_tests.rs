//! Redis/queue integration tests.

use hedcut_models::{EditingScript, JobId};
use hedcut_queue::{RenderQueue, RenderTask, RetryDecision, TaskState};

fn test_task() -> RenderTask {
    let job_id = JobId::new();
    RenderTask {
        job_id: job_id.clone(),
        user_id: "test_user".to_string(),
        input_video_path: format!("test_user/{job_id}/input.mp4"),
        editing_script: EditingScript::new(job_id.as_str()),
    }
}

/// Test queue connection and metrics.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_queue_connection() {
    dotenvy::dotenv().ok();

    let queue = RenderQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let metrics = queue.metrics().await.expect("Failed to get metrics");
    println!("Queue metrics: {metrics:?}");
}

/// Test enqueue, consume, complete cycle.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_enqueue_consume_complete() {
    dotenvy::dotenv().ok();

    let queue = RenderQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let task = test_task();
    let job_id = task.job_id.clone();

    let message_id = queue
        .enqueue_render(&task)
        .await
        .expect("Failed to enqueue")
        .expect("fresh task should not be deduplicated");
    println!("Enqueued task for job {job_id} as {message_id}");

    // A second enqueue of the same job is a no-op
    let duplicate = queue.enqueue_render(&task).await.expect("Failed to enqueue");
    assert!(duplicate.is_none());

    let tasks = queue
        .consume("test-consumer", 1000, 1)
        .await
        .expect("Failed to consume");
    assert_eq!(tasks.len(), 1);
    let (msg_id, consumed) = &tasks[0];
    assert_eq!(consumed.job_id, job_id);

    queue
        .complete(&job_id, msg_id)
        .await
        .expect("Failed to complete");

    let status = queue.task_status(&job_id).await.expect("status");
    assert_eq!(status.state, TaskState::Completed);
}

/// Test that a failed attempt is scheduled with backoff, promoted back
/// onto the stream, and can still complete.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_retry_schedule_and_recovery() {
    dotenvy::dotenv().ok();

    let queue = RenderQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let task = test_task();
    let job_id = task.job_id.clone();
    queue
        .enqueue_render(&task)
        .await
        .expect("Failed to enqueue");

    let tasks = queue
        .consume("test-consumer", 1000, 1)
        .await
        .expect("Failed to consume");
    let (msg_id, _) = &tasks[0];

    let decision = queue
        .fail_attempt(&task, msg_id, "render worker unavailable", true)
        .await
        .expect("fail_attempt");
    assert!(matches!(
        decision,
        RetryDecision::Scheduled {
            attempt: 1,
            delay_ms: 2000
        }
    ));

    let status = queue.task_status(&job_id).await.expect("status");
    assert_eq!(status.state, TaskState::Delayed);
    assert_eq!(status.attempts, 1);

    // After the backoff elapses the task is promoted back onto the stream
    tokio::time::sleep(std::time::Duration::from_millis(2500)).await;
    let promoted = queue.promote_due().await.expect("promote");
    assert!(promoted >= 1);

    let tasks = queue
        .consume("test-consumer", 1000, 5)
        .await
        .expect("Failed to consume");
    let (msg_id, _) = tasks
        .iter()
        .find(|(_, t)| t.job_id == job_id)
        .expect("promoted task should be redelivered");

    // A successful attempt after retries still lands on Completed;
    // the redelivery itself was counted as the second attempt
    queue
        .complete(&job_id, msg_id)
        .await
        .expect("Failed to complete");
    let status = queue.task_status(&job_id).await.expect("status");
    assert_eq!(status.state, TaskState::Completed);
    assert_eq!(status.attempts, 2);
}

/// Test that two transient failures followed by a success leave
/// exactly three attempts on the record.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_two_failures_then_success_records_three_attempts() {
    dotenvy::dotenv().ok();

    let queue = RenderQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let task = test_task();
    let job_id = task.job_id.clone();
    queue
        .enqueue_render(&task)
        .await
        .expect("Failed to enqueue");

    for expected_attempt in 1..=2u32 {
        let tasks = queue
            .consume("test-consumer", 1000, 5)
            .await
            .expect("Failed to consume");
        let (msg_id, _) = tasks
            .iter()
            .find(|(_, t)| t.job_id == job_id)
            .expect("task should be delivered");

        let decision = queue
            .fail_attempt(&task, msg_id, "connection reset", true)
            .await
            .expect("fail_attempt");
        assert!(matches!(
            decision,
            RetryDecision::Scheduled { attempt, .. } if attempt == expected_attempt
        ));

        let delay_ms = 2000u64 * 2u64.pow(expected_attempt - 1);
        tokio::time::sleep(std::time::Duration::from_millis(delay_ms + 500)).await;
        assert!(queue.promote_due().await.expect("promote") >= 1);
    }

    let tasks = queue
        .consume("test-consumer", 1000, 5)
        .await
        .expect("Failed to consume");
    let (msg_id, _) = tasks
        .iter()
        .find(|(_, t)| t.job_id == job_id)
        .expect("task should be delivered a third time");
    queue
        .complete(&job_id, msg_id)
        .await
        .expect("Failed to complete");

    let status = queue.task_status(&job_id).await.expect("status");
    assert_eq!(status.state, TaskState::Completed);
    assert_eq!(status.attempts, 3);
}

/// Test that non-retryable failures skip the delay schedule.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_non_retryable_fails_immediately() {
    dotenvy::dotenv().ok();

    let queue = RenderQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let task = test_task();
    queue
        .enqueue_render(&task)
        .await
        .expect("Failed to enqueue");
    let tasks = queue
        .consume("test-consumer", 1000, 1)
        .await
        .expect("Failed to consume");
    let (msg_id, _) = &tasks[0];

    let decision = queue
        .fail_attempt(&task, msg_id, "editing script rejected", false)
        .await
        .expect("fail_attempt");
    assert_eq!(decision, RetryDecision::Exhausted);

    let status = queue.task_status(&task.job_id).await.expect("status");
    assert_eq!(status.state, TaskState::Failed);
}

/// Test cancel on a waiting task.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_cancel_waiting_task() {
    dotenvy::dotenv().ok();

    let queue = RenderQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let task = test_task();
    queue
        .enqueue_render(&task)
        .await
        .expect("Failed to enqueue");

    queue.cancel(&task.job_id).await.expect("Failed to cancel");
    let status = queue.task_status(&task.job_id).await.expect("status");
    assert_eq!(status.state, TaskState::Cancelled);

    // Cancelled tasks never reach a consumer
    let tasks = queue
        .consume("test-consumer", 1000, 5)
        .await
        .expect("Failed to consume");
    assert!(tasks.iter().all(|(_, t)| t.job_id != task.job_id));
}
