//! # media-dl
//!
//! Backend service for orchestrating media downloads through an external
//! extraction engine (yt-dlp).
//!
//! ## What it does
//!
//! - **Job lifecycle** - Each download runs on a supervised background task
//!   and is observable through an in-memory registry from the moment it is
//!   submitted
//! - **Progress aggregation** - Engine progress arrives over a channel and is
//!   folded into a single polling-friendly job record
//! - **Retry on contention** - Transient file-access failures during
//!   finalization are retried with exponential backoff
//! - **REST API** - Inspect a URL, submit a job, poll its progress, and
//!   stream the finished artifact
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, JobRunner, YtDlpEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::default());
//!     let engine = Arc::new(YtDlpEngine::new(config.engine.clone()));
//!     let runner = Arc::new(JobRunner::new(engine, config.clone()));
//!
//!     let id = runner
//!         .clone()
//!         .submit("https://example.com/watch?v=abc".to_string(), Some(1080))
//!         .await?;
//!
//!     // Poll the registry until the job reaches a terminal state
//!     while let Some(job) = runner.registry().get(&id) {
//!         if job.is_terminal() {
//!             println!("{}: {}", job.status, job.filename);
//!             break;
//!         }
//!         tokio::time::sleep(std::time::Duration::from_millis(500)).await;
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Extraction engine abstraction and the yt-dlp adapter
pub mod engine;
/// Error types
pub mod error;
/// Quality tiers and engine format selection
pub mod format;
/// In-memory job registry
pub mod registry;
/// Retry logic with exponential backoff
pub mod retry;
/// Job orchestration
pub mod runner;
/// Filename sanitization
pub mod sanitize;
/// Core types
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::{Config, EngineConfig, RetryConfig, ServerConfig};
pub use engine::{DownloadRequest, MediaEngine, YtDlpEngine};
pub use error::{ApiError, EngineError, EngineErrorKind, Error, Result};
pub use format::{FormatSelection, QUALITY_CEILING, resolve_tier, select_format};
pub use registry::JobRegistry;
pub use runner::{JobRunner, spawn_eviction_sweeper};
pub use sanitize::sanitize_filename;
pub use types::{Job, JobId, MediaMetadata, ProgressEvent, Status};

/// Wait for a shutdown signal (SIGINT or SIGTERM on unix, Ctrl-C elsewhere)
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT, shutting down");
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Received Ctrl-C, shutting down");
    }
}
