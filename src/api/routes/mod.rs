//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`media`] — Media inspection, job submission, progress, artifact retrieval
//! - [`system`] — Health and OpenAPI

use serde::{Deserialize, Serialize};

mod media;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use media::*;
pub use system::*;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for POST /api/info
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct InfoRequest {
    /// Media URL to inspect
    pub url: String,
}

/// Response body for POST /api/info
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct InfoResponse {
    /// Media title (raw, not sanitized; sanitization is for filenames)
    pub title: String,
    /// Thumbnail URL
    pub thumbnail: String,
    /// Duration in seconds
    pub duration: f64,
    /// Channel or uploader name
    pub channel: String,
    /// View count
    pub views: u64,
    /// Description, truncated to 500 characters
    pub description: String,
    /// Selectable quality tiers, highest resolution first, audio entry last
    pub qualities: Vec<crate::types::QualityOption>,
}

/// Request body for POST /api/download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct StartDownloadRequest {
    /// Media URL to download
    pub url: String,
    /// Quality tier: 0 for audio-only, otherwise a resolution ceiling.
    /// Absent means best available.
    pub quality: Option<u32>,
}

/// Response body for POST /api/download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct StartDownloadResponse {
    /// Identifier for polling GET /api/progress/{id}
    pub download_id: String,
}

/// One artifact in the GET /api/downloads listing
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DownloadedFile {
    /// File name (no directory component)
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Last-modified time as a Unix timestamp
    pub modified: i64,
}
