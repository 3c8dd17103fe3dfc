//! Error types for media-dl
//!
//! This module provides error handling for the service, including:
//! - The crate-wide [`Error`] type used by the orchestration layer and API
//! - [`EngineError`] with a typed [`EngineErrorKind`] classification produced
//!   at the extraction-engine adapter boundary
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download_dir")
        key: Option<String>,
    },

    /// Client supplied an invalid or missing request field
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Extraction engine failure (carries the typed classification)
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Job id is unknown to the registry
    #[error("job {0} not found")]
    JobNotFound(String),

    /// Job id already present in the registry
    #[error("job {0} already exists")]
    DuplicateJob(String),

    /// File retrieval requested before the job reached `completed`
    #[error("job {id} is not completed (status: {status})")]
    JobNotCompleted {
        /// The job whose artifact was requested
        id: String,
        /// The job's current status
        status: String,
    },

    /// Completed job's artifact is missing from disk
    #[error("artifact not found at {0}")]
    ArtifactMissing(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Failure class of an extraction-engine call.
///
/// The yt-dlp adapter classifies raw engine output into one of these kinds
/// exactly once, at the adapter boundary; everything above it (retry policy,
/// HTTP mapping) dispatches on the kind, never on message text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EngineErrorKind {
    /// Transient file-access contention (output file locked by another
    /// process during finalization); the only retryable class
    TransientIo,
    /// The requested media does not exist or is unavailable
    NotFound,
    /// The URL is malformed or unsupported by the engine
    InvalidInput,
    /// Anything the adapter could not classify
    Unknown,
}

/// Error returned by an extraction-engine call
#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct EngineError {
    /// Typed failure classification
    pub kind: EngineErrorKind,
    /// Human-readable message, surfaced verbatim in the job record
    pub message: String,
}

impl EngineError {
    /// Create an engine error with an explicit kind
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Transient file-access contention (retryable)
    pub fn transient_io(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::TransientIo, message)
    }

    /// Media not found / unavailable
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::NotFound, message)
    }

    /// Malformed or unsupported URL
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::InvalidInput, message)
    }

    /// Unclassified failure
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Unknown, message)
    }
}

/// API error response format
///
/// Returned by API endpoints when an error occurs: a machine-readable code,
/// a human-readable message, and optional contextual details.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "job_not_found",
///     "message": "job 3f2a... not found",
///     "details": {
///       "job_id": "3f2a..."
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "job_not_found", "invalid_request")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let code = err.error_code().to_string();
        let message = err.to_string();
        let details = match &err {
            Error::JobNotFound(id) | Error::DuplicateJob(id) => {
                Some(serde_json::json!({ "job_id": id }))
            }
            Error::JobNotCompleted { id, status } => {
                Some(serde_json::json!({ "job_id": id, "status": status }))
            }
            Error::ArtifactMissing(path) => Some(serde_json::json!({ "path": path })),
            Error::Engine(e) => Some(serde_json::json!({ "kind": e.kind })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            _ => None,
        };
        Self {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - client error (invalid input, premature fetch)
            Error::InvalidRequest(_) => 400,
            Error::JobNotCompleted { .. } => 400,
            Error::Config { .. } => 400,

            // 404 Not Found
            Error::JobNotFound(_) => 404,
            Error::ArtifactMissing(_) => 404,

            // 409 Conflict
            Error::DuplicateJob(_) => 409,

            // Engine failures map by classification
            Error::Engine(e) => match e.kind {
                EngineErrorKind::InvalidInput => 400,
                EngineErrorKind::NotFound => 404,
                EngineErrorKind::TransientIo | EngineErrorKind::Unknown => 502,
            },

            // 500 Internal Server Error
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidRequest(_) => "invalid_request",
            Error::Engine(e) => match e.kind {
                EngineErrorKind::TransientIo => "engine_transient_io",
                EngineErrorKind::NotFound => "media_not_found",
                EngineErrorKind::InvalidInput => "invalid_url",
                EngineErrorKind::Unknown => "engine_error",
            },
            Error::JobNotFound(_) => "job_not_found",
            Error::DuplicateJob(_) => "duplicate_job",
            Error::JobNotCompleted { .. } => "job_not_completed",
            Error::ArtifactMissing(_) => "artifact_missing",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_not_found_maps_to_404() {
        let err = Error::JobNotFound("abc".to_string());
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.error_code(), "job_not_found");
    }

    #[test]
    fn not_completed_maps_to_400() {
        let err = Error::JobNotCompleted {
            id: "abc".to_string(),
            status: "downloading".to_string(),
        };
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "job_not_completed");
    }

    #[test]
    fn engine_errors_map_by_kind() {
        assert_eq!(
            Error::Engine(EngineError::invalid_input("bad url")).status_code(),
            400
        );
        assert_eq!(
            Error::Engine(EngineError::not_found("gone")).status_code(),
            404
        );
        assert_eq!(
            Error::Engine(EngineError::unknown("boom")).status_code(),
            502
        );
        assert_eq!(
            Error::Engine(EngineError::transient_io("locked")).status_code(),
            502
        );
    }

    #[test]
    fn api_error_carries_job_details() {
        let api_error: ApiError = Error::JobNotCompleted {
            id: "xyz".to_string(),
            status: "starting".to_string(),
        }
        .into();

        assert_eq!(api_error.error.code, "job_not_completed");
        let details = api_error.error.details.unwrap();
        assert_eq!(details["job_id"], "xyz");
        assert_eq!(details["status"], "starting");
    }

    #[test]
    fn engine_error_message_is_preserved_verbatim() {
        let err = EngineError::transient_io("output.mp4 is being used by another process");
        assert_eq!(
            err.to_string(),
            "output.mp4 is being used by another process"
        );
        assert_eq!(err.kind, EngineErrorKind::TransientIo);
    }
}
