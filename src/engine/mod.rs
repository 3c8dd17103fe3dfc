//! Extraction engine abstraction.
//!
//! The orchestration layer talks to the media extractor through the
//! [`MediaEngine`] trait: one call to inspect a URL and one to download it,
//! with progress delivered over a channel instead of callbacks so the engine
//! never sees job records. The production implementation shells out to
//! yt-dlp; tests substitute a scripted fake.

use crate::error::EngineError;
use crate::format::FormatSelection;
use crate::types::{MediaMetadata, ProgressEvent};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::mpsc;

pub mod ytdlp;

pub use ytdlp::YtDlpEngine;

/// Everything the engine needs to perform one download
#[derive(Clone, Debug)]
pub struct DownloadRequest {
    /// Media URL to download
    pub url: String,
    /// Resolved format selection for the requested quality tier
    pub selection: FormatSelection,
    /// Directory the artifact is written into
    pub output_dir: PathBuf,
}

/// Interface to a media extraction engine
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Fetch metadata for a URL without downloading anything
    async fn fetch_metadata(&self, url: &str) -> Result<MediaMetadata, EngineError>;

    /// Download the media described by `request`, reporting progress on
    /// `progress` as it goes. Returns the path of the produced artifact.
    ///
    /// The sender may be dropped by the receiver at any point; sends after
    /// that are allowed to fail silently.
    async fn download(
        &self,
        request: DownloadRequest,
        progress: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<PathBuf, EngineError>;
}
