//! Job orchestration.
//!
//! [`JobRunner`] owns the whole lifecycle of a download: it registers the
//! job, runs the metadata and download phases on a supervised tokio task,
//! forwards engine progress into the registry, applies the retry policy to
//! transient failures, and records the terminal outcome. Concurrency is
//! bounded by a semaphore; submissions beyond the bound stay queued and
//! observable in `starting`.

use crate::config::Config;
use crate::engine::{DownloadRequest, MediaEngine};
use crate::error::{Error, Result};
use crate::format::{resolve_tier, select_format};
use crate::registry::JobRegistry;
use crate::retry::retry_with_backoff;
use crate::sanitize::sanitize_filename;
use crate::types::{JobId, ProgressEvent, Status};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore, mpsc};
use tokio::task::JoinHandle;

/// Supervises download jobs from submission to terminal state
pub struct JobRunner {
    registry: Arc<JobRegistry>,
    engine: Arc<dyn MediaEngine>,
    config: Arc<Config>,
    concurrency: Arc<Semaphore>,
    active: Mutex<HashMap<JobId, JoinHandle<()>>>,
}

impl JobRunner {
    /// Create a runner over the given engine and configuration
    pub fn new(engine: Arc<dyn MediaEngine>, config: Arc<Config>) -> Self {
        Self {
            registry: Arc::new(JobRegistry::new()),
            engine,
            config: config.clone(),
            concurrency: Arc::new(Semaphore::new(config.max_concurrent_jobs)),
            active: Mutex::new(HashMap::new()),
        }
    }

    /// The shared job registry
    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// The extraction engine
    pub fn engine(&self) -> &Arc<dyn MediaEngine> {
        &self.engine
    }

    /// The runner's configuration
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Number of jobs currently running or queued on a task
    pub async fn active_count(&self) -> usize {
        self.active.lock().await.len()
    }

    /// Register a new job and start it on a supervised background task.
    ///
    /// Returns immediately with the job id; progress is observable through
    /// the registry from the moment this returns.
    pub async fn submit(self: Arc<Self>, url: String, quality: Option<u32>) -> Result<JobId> {
        let id = JobId::new();
        self.registry.create(id.clone())?;

        tracing::info!(job_id = %id, url = %url, quality = ?quality, "Job submitted");

        let runner = Arc::clone(&self);
        let task_id = id.clone();

        // Holding the map lock across spawn+insert means the task's own
        // removal cannot run before the handle is inserted.
        let mut active = self.active.lock().await;
        let handle = tokio::spawn(async move {
            runner.execute(task_id.clone(), url, quality).await;
            runner.active.lock().await.remove(&task_id);
        });
        active.insert(id.clone(), handle);
        drop(active);

        Ok(id)
    }

    /// Run one job to its terminal state, recording the outcome
    async fn execute(&self, id: JobId, url: String, quality: Option<u32>) {
        // Bound concurrency; a closed semaphore cannot happen since we never
        // close it, but a join error still ends the job cleanly.
        let _permit = match self.concurrency.acquire().await {
            Ok(permit) => permit,
            Err(_) => return,
        };

        match self.run_job(&id, &url, quality).await {
            Ok(path) => {
                tracing::info!(job_id = %id, path = %path.display(), "Job completed");
            }
            Err(err) => {
                let message = match &err {
                    // Engine messages reach the client verbatim.
                    Error::Engine(e) => e.message.clone(),
                    other => other.to_string(),
                };
                tracing::error!(job_id = %id, error = %err, "Job failed");
                let _ = self.registry.update(&id, |job| {
                    job.status = Status::Error;
                    job.error = Some(message);
                });
            }
        }
    }

    /// Metadata phase, then the download phase under the retry policy
    async fn run_job(&self, id: &JobId, url: &str, quality: Option<u32>) -> Result<PathBuf> {
        let metadata = self.engine.fetch_metadata(url).await?;
        let title = sanitize_filename(&metadata.title);

        self.registry.update(id, |job| {
            job.status = Status::Downloading;
            job.title = title;
            job.thumbnail = metadata.thumbnail.clone();
            job.duration = metadata.duration;
        })?;

        let selection = select_format(resolve_tier(quality));
        let audio_only = selection.is_audio_only();
        let request = DownloadRequest {
            url: url.to_string(),
            selection,
            output_dir: self.config.download_dir.clone(),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let forwarder = tokio::spawn(forward_progress(
            Arc::clone(&self.registry),
            id.clone(),
            rx,
        ));

        let registry = &self.registry;
        let engine = &self.engine;
        let result = retry_with_backoff(
            &self.config.retry,
            |attempt, err| {
                tracing::warn!(job_id = %id, attempt, error = %err, "Download attempt failed, backing off");
                let _ = registry.update(id, |job| job.status = Status::Retrying);
            },
            || {
                let tx = tx.clone();
                let request = request.clone();
                async move {
                    let _ = registry.update(id, |job| job.status = Status::Downloading);
                    engine.download(request, tx).await
                }
            },
        )
        .await;

        // Close our end so the forwarder drains and exits.
        drop(tx);
        let _ = forwarder.await;

        let path = result?;
        let path = if audio_only {
            // Audio extraction replaces the container the engine first wrote.
            path.with_extension("mp3")
        } else {
            path
        };

        self.registry.update(id, |job| {
            job.status = Status::Completed;
            job.progress = 100.0;
            job.filename = path.display().to_string();
            job.speed = 0.0;
            job.eta = 0.0;
        })?;

        Ok(path)
    }
}

/// Drain one job's progress channel into its registry record.
///
/// Percentages only move forward, and an event without a known total leaves
/// the percentage alone while still refreshing speed and ETA.
async fn forward_progress(
    registry: Arc<JobRegistry>,
    id: JobId,
    mut rx: mpsc::UnboundedReceiver<ProgressEvent>,
) {
    while let Some(event) = rx.recv().await {
        let result = match event {
            ProgressEvent::Downloading {
                downloaded_bytes,
                total_bytes,
                speed,
                eta,
            } => registry.update(&id, |job| {
                if let Some(total) = total_bytes {
                    if total > 0 {
                        #[allow(clippy::cast_precision_loss)]
                        let pct = (downloaded_bytes as f64 / total as f64 * 100.0).min(100.0);
                        job.progress = job.progress.max(pct);
                    }
                }
                if let Some(speed) = speed {
                    job.speed = speed;
                }
                if let Some(eta) = eta {
                    job.eta = eta;
                }
            }),
            ProgressEvent::Finished => registry.update(&id, |job| {
                job.progress = 100.0;
                job.status = Status::Processing;
                job.speed = 0.0;
                job.eta = 0.0;
            }),
        };
        // The record may already be terminal or evicted; late events are fine.
        if result.is_err() {
            break;
        }
    }
}

/// Periodically evict terminal records older than `ttl`.
///
/// Runs until the registry handle is dropped; callers keep the returned
/// handle only if they want to abort the sweep explicitly.
pub fn spawn_eviction_sweeper(registry: Arc<JobRegistry>, ttl: Duration) -> JoinHandle<()> {
    let period = ttl.min(Duration::from_secs(60)).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            registry.evict_terminal(ttl);
        }
    })
}
