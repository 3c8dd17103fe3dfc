//! Media handlers: URL inspection, job submission, progress polling,
//! artifact retrieval, and the downloads listing.

use super::{DownloadedFile, InfoRequest, InfoResponse, StartDownloadRequest, StartDownloadResponse};
use crate::api::AppState;
use crate::error::{Error, Result};
use crate::format::quality_label;
use crate::types::{JobId, MediaMetadata, QualityOption, Status};
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio_util::io::ReaderStream;
use url::Url;

/// Longest description returned by /api/info
const DESCRIPTION_LIMIT: usize = 500;

/// Reject empty or unparseable URLs before they reach the engine
fn validate_url(raw: &str) -> Result<()> {
    if raw.trim().is_empty() {
        return Err(Error::InvalidRequest("url is required".to_string()));
    }
    Url::parse(raw).map_err(|_| Error::InvalidRequest(format!("'{raw}' is not a valid URL")))?;
    Ok(())
}

/// POST /api/info - Inspect a media URL without downloading
#[utoipa::path(
    post,
    path = "/api/info",
    tag = "media",
    request_body = InfoRequest,
    responses(
        (status = 200, description = "Media metadata and selectable qualities", body = InfoResponse),
        (status = 400, description = "Missing or invalid URL", body = crate::error::ApiError),
        (status = 404, description = "Media not found or unavailable", body = crate::error::ApiError),
        (status = 502, description = "Engine failure", body = crate::error::ApiError)
    )
)]
pub async fn media_info(
    State(state): State<AppState>,
    Json(request): Json<InfoRequest>,
) -> Result<Json<InfoResponse>> {
    validate_url(&request.url)?;

    let metadata = state
        .runner
        .engine()
        .fetch_metadata(&request.url)
        .await
        .map_err(Error::Engine)?;

    Ok(Json(build_info_response(metadata)))
}

/// Collapse the engine's format list into one entry per resolution, highest
/// first, with an audio-only pseudo-entry at the end
fn build_info_response(metadata: MediaMetadata) -> InfoResponse {
    // Per height, keep the largest size estimate and a representative note.
    let mut by_height: BTreeMap<u32, (u64, String)> = BTreeMap::new();
    let mut audio_size = 0u64;

    for format in &metadata.formats {
        if format.has_video() {
            if let Some(height) = format.height {
                let entry = by_height.entry(height).or_insert((0, String::new()));
                entry.0 = entry.0.max(format.size_bytes());
                if entry.1.is_empty() {
                    entry.1 = format.format_note.clone().unwrap_or_default();
                }
            }
        } else {
            audio_size = audio_size.max(format.size_bytes());
        }
    }

    let mut qualities: Vec<QualityOption> = by_height
        .into_iter()
        .rev()
        .map(|(height, (filesize, format_note))| QualityOption {
            height,
            label: quality_label(height),
            filesize,
            format_note,
        })
        .collect();

    qualities.push(QualityOption {
        height: 0,
        label: quality_label(0),
        filesize: audio_size,
        format_note: "mp3".to_string(),
    });

    let description: String = metadata.description.chars().take(DESCRIPTION_LIMIT).collect();

    InfoResponse {
        title: metadata.title,
        thumbnail: metadata.thumbnail,
        duration: metadata.duration,
        channel: metadata.channel,
        views: metadata.views,
        description,
        qualities,
    }
}

/// POST /api/download - Submit a download job
#[utoipa::path(
    post,
    path = "/api/download",
    tag = "media",
    request_body = StartDownloadRequest,
    responses(
        (status = 200, description = "Job accepted", body = StartDownloadResponse),
        (status = 400, description = "Missing or invalid URL", body = crate::error::ApiError)
    )
)]
pub async fn start_download(
    State(state): State<AppState>,
    Json(request): Json<StartDownloadRequest>,
) -> Result<Json<StartDownloadResponse>> {
    validate_url(&request.url)?;

    let id = state.runner.submit(request.url, request.quality).await?;

    Ok(Json(StartDownloadResponse {
        download_id: id.to_string(),
    }))
}

/// GET /api/progress/{id} - Poll a job's state
#[utoipa::path(
    get,
    path = "/api/progress/{id}",
    tag = "media",
    params(
        ("id" = String, Path, description = "Job identifier from /api/download")
    ),
    responses(
        (status = 200, description = "Current job record", body = crate::types::Job),
        (status = 404, description = "Unknown job id", body = crate::error::ApiError)
    )
)]
pub async fn get_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<crate::types::Job>> {
    let job_id = JobId::parse(&id).ok_or_else(|| Error::JobNotFound(id.clone()))?;
    let job = state
        .runner
        .registry()
        .get(&job_id)
        .ok_or(Error::JobNotFound(id))?;
    Ok(Json(job))
}

/// GET /api/file/{id} - Stream a completed job's artifact
#[utoipa::path(
    get,
    path = "/api/file/{id}",
    tag = "media",
    params(
        ("id" = String, Path, description = "Job identifier from /api/download")
    ),
    responses(
        (status = 200, description = "The artifact bytes (audio/mpeg or video/mp4)"),
        (status = 400, description = "Job has not completed", body = crate::error::ApiError),
        (status = 404, description = "Unknown job or missing artifact", body = crate::error::ApiError)
    )
)]
pub async fn get_file(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let job_id = JobId::parse(&id).ok_or_else(|| Error::JobNotFound(id.clone()))?;
    let job = state
        .runner
        .registry()
        .get(&job_id)
        .ok_or_else(|| Error::JobNotFound(id.clone()))?;

    if job.status != Status::Completed {
        return Err(Error::JobNotCompleted {
            id,
            status: job.status.to_string(),
        });
    }

    let path = PathBuf::from(&job.filename);
    if !path.exists() {
        return Err(Error::ArtifactMissing(path));
    }

    let is_audio = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mp3"));
    let content_type = if is_audio { "audio/mpeg" } else { "video/mp4" };
    let extension = if is_audio { ".mp3" } else { ".mp4" };

    let mut download_name = if job.title.is_empty() {
        "download".to_string()
    } else {
        job.title.clone()
    };
    if !download_name.to_lowercase().ends_with(extension) {
        download_name.push_str(extension);
    }

    let file = tokio::fs::File::open(&path).await?;
    let size = file.metadata().await?.len();
    let stream = ReaderStream::new(file);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, size)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&download_name),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| Error::ApiServerError(e.to_string()))?;

    Ok(response)
}

/// Build a Content-Disposition value carrying both an ASCII-safe fallback
/// name and the full UTF-8 name in RFC 5987 form
fn content_disposition(name: &str) -> String {
    let ascii: String = name
        .chars()
        .map(|c| if c.is_ascii() && c != '"' { c } else { '_' })
        .collect();
    let encoded = urlencoding::encode(name);
    format!("attachment; filename=\"{ascii}\"; filename*=UTF-8''{encoded}")
}

/// GET /api/downloads - List video artifacts in the download directory
#[utoipa::path(
    get,
    path = "/api/downloads",
    tag = "media",
    responses(
        (status = 200, description = "Artifacts on disk, newest first", body = [DownloadedFile]),
        (status = 500, description = "Download directory unreadable", body = crate::error::ApiError)
    )
)]
pub async fn list_downloads(State(state): State<AppState>) -> Result<Json<Vec<DownloadedFile>>> {
    let mut files = Vec::new();

    let mut entries = match tokio::fs::read_dir(&state.config.download_dir).await {
        Ok(entries) => entries,
        // A directory that does not exist yet is an empty listing, not an error.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Json(files)),
        Err(e) => return Err(Error::Io(e)),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("mp4")) {
            continue;
        }
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata
            .modified()
            .map(|t| DateTime::<Utc>::from(t).timestamp())
            .unwrap_or(0);
        files.push(DownloadedFile {
            name: entry.file_name().to_string_lossy().into_owned(),
            size: metadata.len(),
            modified,
        });
    }

    files.sort_by(|a, b| b.modified.cmp(&a.modified));
    Ok(Json(files))
}
