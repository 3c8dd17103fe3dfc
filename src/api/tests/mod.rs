//! Router integration tests.
//!
//! Each test drives the real router through `tower::ServiceExt::oneshot`
//! with a scripted engine, so the full handler/state/error-mapping stack is
//! exercised without a network or a yt-dlp binary.

use crate::api::create_router;
use crate::config::{Config, RetryConfig};
use crate::error::{ApiError, EngineError};
use crate::runner::JobRunner;
use crate::test_helpers::{DownloadScript, FakeEngine, sample_metadata};
use crate::types::{Job, JobId, Status};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn test_config(download_dir: &Path) -> Arc<Config> {
    Arc::new(Config {
        download_dir: download_dir.to_path_buf(),
        retry: RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(50),
            backoff_multiplier: 2.0,
            jitter: false,
        },
        ..Config::default()
    })
}

fn test_app(engine: Arc<FakeEngine>, download_dir: &Path) -> (Router, Arc<JobRunner>) {
    let config = test_config(download_dir);
    let runner = Arc::new(JobRunner::new(engine, config.clone()));
    (create_router(runner.clone(), config), runner)
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn wait_for_status(app: &Router, id: &str, wanted: Status) -> Job {
    for _ in 0..400 {
        let (status, body) = get(app, &format!("/api/progress/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        let job: Job = serde_json::from_value(body).unwrap();
        if job.status == wanted {
            return job;
        }
        assert_ne!(
            job.status,
            Status::Error,
            "job failed while waiting for {wanted}: {:?}",
            job.error
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {id} never reached {wanted}");
}

#[tokio::test]
async fn health_reports_ok() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(Arc::new(FakeEngine::new()), dir.path());

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn openapi_spec_is_served() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(Arc::new(FakeEngine::new()), dir.path());

    let (status, body) = get(&app, "/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/download"].is_object());
}

#[tokio::test]
async fn info_returns_metadata_and_quality_ladder() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::new());
    engine.push_metadata(Ok(sample_metadata()));
    let (app, _) = test_app(engine, dir.path());

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/info",
        json!({"url": "https://example.com/watch?v=abc"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Test Video: The \"Best\" One 🎬");
    assert_eq!(body["channel"], "Test Channel");
    assert_eq!(body["views"], 123_456);

    let qualities = body["qualities"].as_array().unwrap();
    assert_eq!(qualities.len(), 3);
    assert_eq!(qualities[0]["height"], 1080);
    assert_eq!(qualities[0]["label"], "1080p");
    assert_eq!(qualities[2]["height"], 0);
    assert_eq!(qualities[2]["label"], "Audio Only (MP3)");
}

#[tokio::test]
async fn info_rejects_missing_url() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(Arc::new(FakeEngine::new()), dir.path());

    let (status, body) = send_json(&app, "POST", "/api/info", json!({"url": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err: ApiError = serde_json::from_value(body).unwrap();
    assert_eq!(err.error.code, "invalid_request");
}

#[tokio::test]
async fn info_maps_unavailable_media_to_404() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::new());
    engine.push_metadata(Err(EngineError::not_found("Video unavailable")));
    let (app, _) = test_app(engine, dir.path());

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/info",
        json!({"url": "https://example.com/watch?v=gone"}),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let err: ApiError = serde_json::from_value(body).unwrap();
    assert_eq!(err.error.code, "media_not_found");
}

#[tokio::test]
async fn download_then_poll_then_fetch_file() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("Test Video The Best One.mp4");
    tokio::fs::write(&artifact, b"fake mp4 bytes").await.unwrap();

    let engine = Arc::new(FakeEngine::new());
    engine.push_download(DownloadScript::success(&artifact));
    let (app, _) = test_app(engine, dir.path());

    // Submit
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/download",
        json!({"url": "https://example.com/watch?v=abc", "quality": 1080}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["download_id"].as_str().unwrap().to_string();

    // Poll to completion
    let job = wait_for_status(&app, &id, Status::Completed).await;
    assert_eq!(job.progress, 100.0);
    assert_eq!(job.title, "Test Video The Best One");

    // Fetch the artifact
    let request = Request::builder()
        .uri(format!("/api/file/{id}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "video/mp4"
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("attachment; filename=\"Test Video The Best One.mp4\""));
    assert!(disposition.contains("filename*=UTF-8''"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"fake mp4 bytes");
}

#[tokio::test]
async fn audio_artifact_is_served_as_mpeg() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("Song.webm");
    // The runner reports the mp3 path after extraction.
    tokio::fs::write(dir.path().join("Song.mp3"), b"id3 bytes").await.unwrap();

    let engine = Arc::new(FakeEngine::new());
    engine.push_download(DownloadScript::success(&artifact));
    let (app, _) = test_app(engine, dir.path());

    let (_, body) = send_json(
        &app,
        "POST",
        "/api/download",
        json!({"url": "https://example.com/song", "quality": 0}),
    )
    .await;
    let id = body["download_id"].as_str().unwrap().to_string();

    wait_for_status(&app, &id, Status::Completed).await;

    let request = Request::builder()
        .uri(format!("/api/file/{id}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap();
    assert!(disposition.contains(".mp3"));
}

#[tokio::test]
async fn download_rejects_missing_url() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(Arc::new(FakeEngine::new()), dir.path());

    let (status, body) = send_json(&app, "POST", "/api/download", json!({"url": "   "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err: ApiError = serde_json::from_value(body).unwrap();
    assert_eq!(err.error.code, "invalid_request");
}

#[tokio::test]
async fn progress_for_unknown_id_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = test_app(Arc::new(FakeEngine::new()), dir.path());

    // Well-formed but unknown uuid
    let (status, body) = get(&app, &format!("/api/progress/{}", JobId::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let err: ApiError = serde_json::from_value(body).unwrap();
    assert_eq!(err.error.code, "job_not_found");

    // Not a uuid at all
    let (status, _) = get(&app, "/api/progress/not-a-uuid").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn file_fetch_before_completion_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let (app, runner) = test_app(Arc::new(FakeEngine::new()), dir.path());

    // Seed a live record directly; no task is running for it.
    let id = JobId::new();
    runner.registry().create(id.clone()).unwrap();
    runner
        .registry()
        .update(&id, |job| job.status = Status::Downloading)
        .unwrap();

    let (status, body) = get(&app, &format!("/api/file/{id}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err: ApiError = serde_json::from_value(body).unwrap();
    assert_eq!(err.error.code, "job_not_completed");
    assert_eq!(err.error.details.unwrap()["status"], "downloading");
}

#[tokio::test]
async fn file_fetch_with_missing_artifact_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let (app, runner) = test_app(Arc::new(FakeEngine::new()), dir.path());

    let id = JobId::new();
    runner.registry().create(id.clone()).unwrap();
    runner
        .registry()
        .update(&id, |job| {
            job.status = Status::Completed;
            job.filename = dir.path().join("vanished.mp4").display().to_string();
        })
        .unwrap();

    let (status, body) = get(&app, &format!("/api/file/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let err: ApiError = serde_json::from_value(body).unwrap();
    assert_eq!(err.error.code, "artifact_missing");
}

#[tokio::test]
async fn downloads_listing_contains_only_mp4_files() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(dir.path().join("one.mp4"), vec![0u8; 100]).await.unwrap();
    tokio::fs::write(dir.path().join("two.MP4"), vec![0u8; 200]).await.unwrap();
    tokio::fs::write(dir.path().join("notes.txt"), b"skip me").await.unwrap();
    tokio::fs::write(dir.path().join("song.mp3"), b"skip me too").await.unwrap();

    let (app, _) = test_app(Arc::new(FakeEngine::new()), dir.path());

    let (status, body) = get(&app, "/api/downloads").await;
    assert_eq!(status, StatusCode::OK);

    let files = body.as_array().unwrap();
    assert_eq!(files.len(), 2);
    let mut names: Vec<&str> = files.iter().map(|f| f["name"].as_str().unwrap()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["one.mp4", "two.MP4"]);
}

#[tokio::test]
async fn downloads_listing_with_missing_directory_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("never-created");
    let config = test_config(&missing);
    let runner = Arc::new(JobRunner::new(Arc::new(FakeEngine::new()), config.clone()));
    let app = create_router(runner, config);

    let (status, body) = get(&app, "/api/downloads").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn failed_job_surfaces_engine_message_in_progress() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::new());
    engine.push_download(DownloadScript::failure(EngineError::not_found(
        "Video unavailable",
    )));
    let (app, _) = test_app(engine, dir.path());

    let (_, body) = send_json(
        &app,
        "POST",
        "/api/download",
        json!({"url": "https://example.com/gone"}),
    )
    .await;
    let id = body["download_id"].as_str().unwrap().to_string();

    for _ in 0..400 {
        let (_, body) = get(&app, &format!("/api/progress/{id}")).await;
        if body["status"] == "error" {
            assert_eq!(body["error"], "Video unavailable");
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job never reached error state");
}
