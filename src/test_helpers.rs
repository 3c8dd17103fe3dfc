//! Scriptable engine fake shared by runner and API tests.

// unwrap/expect are acceptable in test support code for concise
// failure-on-error assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::engine::{DownloadRequest, MediaEngine};
use crate::error::EngineError;
use crate::types::{MediaFormat, MediaMetadata, ProgressEvent};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::mpsc;

/// One scripted answer to a `download` call: events to emit, then the result
#[derive(Debug)]
pub(crate) struct DownloadScript {
    pub events: Vec<ProgressEvent>,
    pub result: Result<PathBuf, EngineError>,
    pub delay: Option<std::time::Duration>,
}

impl DownloadScript {
    pub fn success(path: impl Into<PathBuf>) -> Self {
        Self {
            events: vec![
                ProgressEvent::Downloading {
                    downloaded_bytes: 512,
                    total_bytes: Some(1024),
                    speed: Some(256.0),
                    eta: Some(2.0),
                },
                ProgressEvent::Finished,
            ],
            result: Ok(path.into()),
            delay: None,
        }
    }

    pub fn failure(err: EngineError) -> Self {
        Self {
            events: vec![],
            result: Err(err),
            delay: None,
        }
    }

    /// Hold the call open for `delay` before returning the scripted result,
    /// so tests can observe the in-flight state
    pub fn delayed(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Engine whose answers are scripted up front; calls consume the queues in
/// order and the last script repeats if the queue runs dry
#[derive(Debug, Default)]
pub(crate) struct FakeEngine {
    metadata: Mutex<VecDeque<Result<MediaMetadata, EngineError>>>,
    downloads: Mutex<VecDeque<DownloadScript>>,
    pub download_calls: AtomicU32,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_metadata(&self, result: Result<MediaMetadata, EngineError>) {
        self.metadata.lock().unwrap().push_back(result);
    }

    pub fn push_download(&self, script: DownloadScript) {
        self.downloads.lock().unwrap().push_back(script);
    }

    pub fn download_call_count(&self) -> u32 {
        self.download_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaEngine for FakeEngine {
    async fn fetch_metadata(&self, _url: &str) -> Result<MediaMetadata, EngineError> {
        self.metadata
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(sample_metadata()))
    }

    async fn download(
        &self,
        _request: DownloadRequest,
        progress: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<PathBuf, EngineError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.downloads.lock().unwrap().pop_front();
        match script {
            Some(script) => {
                for event in script.events {
                    let _ = progress.send(event);
                    // Let the forwarder observe intermediate states.
                    tokio::task::yield_now().await;
                }
                if let Some(delay) = script.delay {
                    tokio::time::sleep(delay).await;
                }
                script.result
            }
            None => Ok(PathBuf::from("/tmp/fallback.mp4")),
        }
    }
}

/// Plausible metadata for a 1080p video with an audio-only stream
pub(crate) fn sample_metadata() -> MediaMetadata {
    MediaMetadata {
        title: "Test Video: The \"Best\" One 🎬".to_string(),
        thumbnail: "https://example.com/thumb.jpg".to_string(),
        duration: 212.0,
        channel: "Test Channel".to_string(),
        views: 123_456,
        description: "A description".to_string(),
        formats: vec![
            MediaFormat {
                height: Some(1080),
                vcodec: Some("avc1.640028".to_string()),
                filesize: Some(50_000_000),
                filesize_approx: None,
                format_note: Some("1080p".to_string()),
            },
            MediaFormat {
                height: Some(720),
                vcodec: Some("avc1.4d401f".to_string()),
                filesize: None,
                filesize_approx: Some(25_000_000),
                format_note: Some("720p".to_string()),
            },
            MediaFormat {
                height: None,
                vcodec: Some("none".to_string()),
                filesize: Some(3_000_000),
                filesize_approx: None,
                format_note: Some("medium".to_string()),
            },
        ],
    }
}
