//! API integration tests.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use hedcut_api::{create_router, ApiConfig, AppState};

async fn test_app() -> axum::Router {
    dotenvy::dotenv().ok();
    let state = AppState::new(ApiConfig::default())
        .await
        .expect("Failed to create app state");
    create_router(state, None)
}

/// Test health endpoint.
#[tokio::test]
#[ignore = "requires live services"]
async fn test_health_endpoint() {
    let app = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

/// Test dispatch input validation.
#[tokio::test]
#[ignore = "requires live services"]
async fn test_process_requires_job_id() {
    let app = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/jobs/process")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Test that non-UUID job ids are rejected before any store access.
#[tokio::test]
#[ignore = "requires live services"]
async fn test_process_rejects_malformed_job_id() {
    let app = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/jobs/process")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"jobId": "not-a-uuid"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Test that job creation rejects invalid upload metadata.
#[tokio::test]
#[ignore = "requires live services"]
async fn test_create_job_rejects_invalid_upload() {
    let app = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/jobs")
                .header("content-type", "application/json")
                .header("x-user-id", "integration_test_user")
                .body(Body::from(
                    r#"{"filename": "doc.pdf", "contentType": "application/pdf", "size": 1024}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Test that job reads require a caller identity.
#[tokio::test]
#[ignore = "requires live services"]
async fn test_jobs_read_requires_identity() {
    let app = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/jobs")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
