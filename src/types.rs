//! Core types: job identifiers, the job record and its state machine,
//! engine progress events, and engine metadata.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a download job (v4 UUID, generated at submission,
/// never reused)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a fresh job identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a job identifier from its string form
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Job status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Submitted, metadata not yet fetched
    Starting,
    /// Engine is transferring bytes
    Downloading,
    /// Waiting out a backoff before another download attempt
    Retrying,
    /// Engine finished transferring; external post-processing/muxing may
    /// still be running
    Processing,
    /// Artifact produced (terminal)
    Completed,
    /// Failed (terminal)
    Error,
}

impl Status {
    /// True for `completed` and `error`; terminal records never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Error)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Starting => "starting",
            Status::Downloading => "downloading",
            Status::Retrying => "retrying",
            Status::Processing => "processing",
            Status::Completed => "completed",
            Status::Error => "error",
        };
        f.write_str(s)
    }
}

/// One tracked download job.
///
/// Serialized as-is for `GET /api/progress/{id}`. The registry enforces the
/// field invariants: `filename` is non-empty iff `completed`, `error` is
/// `Some` iff `error`, and terminal records are immutable.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Job {
    /// Current state in the lifecycle
    pub status: Status,
    /// Percentage in [0, 100]; non-decreasing while downloading/retrying
    pub progress: f64,
    /// Sanitized media title, populated after the metadata phase
    pub title: String,
    /// Thumbnail URL, populated after the metadata phase
    pub thumbnail: String,
    /// Media duration in seconds, populated after the metadata phase
    pub duration: f64,
    /// Absolute path of the produced artifact; set on entering `completed`
    pub filename: String,
    /// Failure message; set on entering `error`
    pub error: Option<String>,
    /// Bytes per second as last reported by the engine
    pub speed: f64,
    /// Estimated seconds remaining as last reported by the engine
    pub eta: f64,
    /// When the job reached a terminal state (drives eviction)
    #[serde(skip)]
    pub(crate) terminal_at: Option<Instant>,
}

impl Job {
    /// Fresh record in `starting` with zeroed progress
    pub fn new() -> Self {
        Self {
            status: Status::Starting,
            progress: 0.0,
            title: String::new(),
            thumbnail: String::new(),
            duration: 0.0,
            filename: String::new(),
            error: None,
            speed: 0.0,
            eta: 0.0,
            terminal_at: None,
        }
    }

    /// True once the job reached `completed` or `error`
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress report delivered by the engine over the per-job channel
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    /// Bytes are being transferred
    Downloading {
        /// Bytes transferred so far
        downloaded_bytes: u64,
        /// Total bytes if known (exact or engine estimate); `None` leaves
        /// the job's progress untouched
        total_bytes: Option<u64>,
        /// Transfer speed in bytes per second, if reported
        speed: Option<f64>,
        /// Estimated seconds remaining, if reported
        eta: Option<f64>,
    },
    /// The engine finished transferring; post-processing may follow
    Finished,
}

/// Metadata for a single stream/format offered by the extraction engine
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MediaFormat {
    /// Vertical resolution, absent for audio-only streams
    #[serde(default)]
    pub height: Option<u32>,
    /// Video codec name; the engine reports `"none"` for audio-only streams
    #[serde(default)]
    pub vcodec: Option<String>,
    /// Exact file size in bytes, if known
    #[serde(default)]
    pub filesize: Option<u64>,
    /// Approximate file size in bytes, if the exact size is unknown
    #[serde(default)]
    pub filesize_approx: Option<u64>,
    /// Engine's human-readable note for the format
    #[serde(default)]
    pub format_note: Option<String>,
}

impl MediaFormat {
    /// True if this format carries a video stream
    pub fn has_video(&self) -> bool {
        self.vcodec.as_deref().is_some_and(|v| v != "none")
    }

    /// Exact size when known, otherwise the engine's estimate, otherwise 0
    pub fn size_bytes(&self) -> u64 {
        self.filesize.or(self.filesize_approx).unwrap_or(0)
    }
}

/// Media metadata returned by the extraction engine's metadata-only mode
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Raw (unsanitized) media title
    pub title: String,
    /// Thumbnail URL
    pub thumbnail: String,
    /// Duration in seconds
    pub duration: f64,
    /// Channel or uploader name
    pub channel: String,
    /// View count
    pub views: u64,
    /// Full description text
    pub description: String,
    /// Available formats
    pub formats: Vec<MediaFormat>,
}

/// One selectable quality tier in the `/api/info` response
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct QualityOption {
    /// Vertical resolution; 0 is the audio-only pseudo-entry
    pub height: u32,
    /// Display label (`4K (2160p)`, `1080p`, `Audio Only (MP3)`, ...)
    pub label: String,
    /// Estimated file size in bytes (0 when unknown)
    pub filesize: u64,
    /// Engine's note for the representative format
    pub format_note: String,
}
