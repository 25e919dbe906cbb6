//! Record store integration tests.

use hedcut_models::{Job, JobStatus};
use hedcut_supabase::{JobUpdate, JobsRepo, SupabaseClient, SupabaseError};

fn repo() -> JobsRepo {
    dotenvy::dotenv().ok();
    JobsRepo::new(SupabaseClient::from_env().expect("Failed to create client"))
}

/// Test job create, read, update round trip.
#[tokio::test]
#[ignore = "requires Supabase"]
async fn test_job_crud() {
    let repo = repo();

    let job = Job::new("integration_test_user", "integration_test_user/x/input.mp4");
    let created = repo.create_job(&job).await.expect("Failed to create job");
    assert_eq!(created.status, JobStatus::Pending);

    let update = JobUpdate::new()
        .status(JobStatus::Queued)
        .progress(5)
        .step("Preparing video");
    let updated = repo
        .update_job(&job.id, &update)
        .await
        .expect("Failed to update job");
    assert_eq!(updated.status, JobStatus::Queued);
    assert_eq!(updated.progress_percentage, 5);

    let fetched = repo.get_job(&job.id).await.expect("Failed to fetch job");
    assert_eq!(fetched.current_step.as_deref(), Some("Preparing video"));
}

/// Test the conditional update guard.
#[tokio::test]
#[ignore = "requires Supabase"]
async fn test_conditional_update_guard() {
    let repo = repo();

    let job = Job::new("integration_test_user", "integration_test_user/y/input.mp4");
    repo.create_job(&job).await.expect("Failed to create job");

    // Matching status succeeds
    repo.update_job_if_status(
        &job.id,
        JobStatus::Pending,
        &JobUpdate::new().status(JobStatus::Queued).progress(5),
    )
    .await
    .expect("conditional update should match");

    // The job is no longer PENDING, so the same guard now fails
    let result = repo
        .update_job_if_status(
            &job.id,
            JobStatus::Pending,
            &JobUpdate::new().status(JobStatus::Queued),
        )
        .await;
    assert!(matches!(result, Err(SupabaseError::PreconditionFailed(_))));
}

/// Test owner-scoped listing order.
#[tokio::test]
#[ignore = "requires Supabase"]
async fn test_list_jobs_newest_first() {
    let repo = repo();

    let jobs = repo
        .list_jobs("integration_test_user", None, 10)
        .await
        .expect("Failed to list jobs");
    for pair in jobs.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }
}
