//! yt-dlp subprocess adapter.
//!
//! Wraps the yt-dlp CLI: metadata comes from its JSON dump mode, downloads
//! run with `--newline` so every progress update arrives as one parseable
//! stdout line. Raw engine failures are classified into a typed
//! [`EngineErrorKind`] here, at the process boundary, so nothing above this
//! module ever matches on message text.

use crate::config::EngineConfig;
use crate::engine::{DownloadRequest, MediaEngine};
use crate::error::{EngineError, EngineErrorKind};
use crate::types::{MediaFormat, MediaMetadata, ProgressEvent};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Extraction engine backed by the yt-dlp CLI
#[derive(Clone, Debug)]
pub struct YtDlpEngine {
    config: EngineConfig,
}

impl YtDlpEngine {
    /// Create an engine using the given configuration
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// First existing cookie file from the configured priority list
    fn find_cookie_file(&self) -> Option<&Path> {
        self.config
            .cookie_paths
            .iter()
            .map(PathBuf::as_path)
            .find(|p| p.exists())
    }

    /// Arguments for one download invocation
    fn download_args(&self, request: &DownloadRequest) -> Vec<String> {
        let retries = self.config.engine_retries.to_string();
        let output_template = request
            .output_dir
            .join("%(title)s.%(ext)s")
            .to_string_lossy()
            .into_owned();

        let mut args = vec![
            "--newline".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--retries".to_string(),
            retries.clone(),
            "--file-access-retries".to_string(),
            retries.clone(),
            "--fragment-retries".to_string(),
            retries,
            "-o".to_string(),
            output_template,
            "-f".to_string(),
            request.selection.format.clone(),
        ];

        if let Some(container) = request.selection.merge_output_format {
            args.push("--merge-output-format".to_string());
            args.push(container.to_string());
        }

        if let Some(audio) = &request.selection.audio {
            args.push("--extract-audio".to_string());
            args.push("--audio-format".to_string());
            args.push(audio.codec.to_string());
            args.push("--audio-quality".to_string());
            args.push(audio.bitrate.to_string());
        }

        if let Some(cookies) = self.find_cookie_file() {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().into_owned());
        }

        args.push(request.url.clone());
        args
    }
}

#[async_trait]
impl MediaEngine for YtDlpEngine {
    async fn fetch_metadata(&self, url: &str) -> Result<MediaMetadata, EngineError> {
        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("-J").arg("--no-playlist").arg("--no-warnings");
        if let Some(cookies) = self.find_cookie_file() {
            cmd.arg("--cookies").arg(cookies);
        }
        cmd.arg(url);

        tracing::debug!(url, binary = %self.config.binary, "Fetching media metadata");

        let output = cmd
            .output()
            .await
            .map_err(|e| EngineError::unknown(format!("failed to spawn {}: {e}", self.config.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&stderr));
        }

        let raw: RawInfo = serde_json::from_slice(&output.stdout)
            .map_err(|e| EngineError::unknown(format!("unparseable metadata output: {e}")))?;
        Ok(raw.into())
    }

    async fn download(
        &self,
        request: DownloadRequest,
        progress: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<PathBuf, EngineError> {
        let args = self.download_args(&request);

        tracing::info!(url = %request.url, format = %request.selection.format, "Starting engine download");

        let mut child = Command::new(&self.config.binary)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EngineError::unknown(format!("failed to spawn {}: {e}", self.config.binary)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::unknown("engine stdout not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::unknown("engine stderr not captured"))?;

        // Drain stderr concurrently so the child never blocks on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut final_path: Option<PathBuf> = None;
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(path) = parse_destination(&line) {
                final_path = Some(path);
            }
            if let Some(event) = parse_progress_line(&line) {
                let finished = matches!(event, ProgressEvent::Finished);
                // Receiver may have hung up; progress is best-effort.
                let _ = progress.send(event);
                if finished {
                    tracing::debug!(url = %request.url, "Engine reported transfer complete");
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| EngineError::unknown(format!("failed to wait for engine: {e}")))?;
        let stderr_text = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(classify_failure(&stderr_text));
        }

        final_path.ok_or_else(|| {
            EngineError::unknown("engine exited successfully without reporting an output file")
        })
    }
}

/// Classify raw engine stderr into a typed error.
///
/// This is the only place in the crate that inspects engine message text.
fn classify_failure(stderr: &str) -> EngineError {
    let message = stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("engine failed without output")
        .trim()
        .to_string();

    let lower = stderr.to_lowercase();
    let kind = if lower.contains("being used by another process") || lower.contains("winerror 32")
    {
        EngineErrorKind::TransientIo
    } else if lower.contains("is not a valid url") || lower.contains("unsupported url") {
        EngineErrorKind::InvalidInput
    } else if lower.contains("video unavailable")
        || lower.contains("this video is not available")
        || lower.contains("not found")
    {
        EngineErrorKind::NotFound
    } else {
        EngineErrorKind::Unknown
    };

    EngineError::new(kind, message)
}

#[allow(clippy::expect_used)]
fn progress_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // [download]  42.5% of ~  10.00MiB at    1.21MiB/s ETA 00:05
        Regex::new(
            r"^\[download\]\s+(?P<pct>[\d.]+)%\s+of\s+~?\s*(?P<total>[\d.]+)(?P<total_unit>[KMGT]?i?B)(?:\s+at\s+(?P<speed>[\d.]+)(?P<speed_unit>[KMGT]?i?B)/s)?(?:\s+ETA\s+(?P<eta>[\d:]+))?",
        )
        .expect("progress regex is valid")
    })
}

#[allow(clippy::expect_used)]
fn finished_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // [download] 100% of 10.00MiB in 00:00:15 at 1.2MiB/s
        Regex::new(r"^\[download\]\s+100%\s+of\s+~?\s*[\d.]+[KMGT]?i?B\s+in\s+")
            .expect("finished regex is valid")
    })
}

#[allow(clippy::expect_used)]
fn destination_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^(?:\[download\]\s+Destination:\s+(?P<dl>.+)|\[Merger\]\s+Merging formats into "(?P<merge>.+)"|\[ExtractAudio\]\s+Destination:\s+(?P<audio>.+)|\[download\]\s+(?P<cached>.+) has already been downloaded)$"#,
        )
        .expect("destination regex is valid")
    })
}

/// Track the artifact path through the engine's phase announcements. Later
/// phases (merge, audio extraction) override the raw stream destination.
fn parse_destination(line: &str) -> Option<PathBuf> {
    let caps = destination_regex().captures(line)?;
    let path = caps
        .name("merge")
        .or_else(|| caps.name("audio"))
        .or_else(|| caps.name("dl"))
        .or_else(|| caps.name("cached"))?;
    Some(PathBuf::from(path.as_str().trim()))
}

/// Parse one `--newline` progress line into an event
fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    if finished_regex().is_match(line) {
        return Some(ProgressEvent::Finished);
    }

    let caps = progress_regex().captures(line)?;
    let pct: f64 = caps.name("pct")?.as_str().parse().ok()?;
    let total = parse_size(caps.name("total")?.as_str(), caps.name("total_unit")?.as_str());

    let speed = match (caps.name("speed"), caps.name("speed_unit")) {
        (Some(value), Some(unit)) => {
            let bytes = parse_size(value.as_str(), unit.as_str())?;
            #[allow(clippy::cast_precision_loss)]
            let bytes_per_sec = bytes as f64;
            Some(bytes_per_sec)
        }
        _ => None,
    };
    let eta = caps.name("eta").and_then(|m| parse_clock(m.as_str()));

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let downloaded_bytes = total
        .map(|t| ((pct / 100.0) * t as f64) as u64)
        .unwrap_or(0);

    Some(ProgressEvent::Downloading {
        downloaded_bytes,
        total_bytes: total,
        speed,
        eta,
    })
}

/// "10.00" + "MiB" -> bytes
fn parse_size(value: &str, unit: &str) -> Option<u64> {
    let value: f64 = value.parse().ok()?;
    let multiplier: f64 = match unit {
        "B" => 1.0,
        "KiB" | "KB" => 1024.0,
        "MiB" | "MB" => 1024.0 * 1024.0,
        "GiB" | "GB" => 1024.0 * 1024.0 * 1024.0,
        "TiB" | "TB" => 1024.0_f64.powi(4),
        _ => return None,
    };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let bytes = (value * multiplier) as u64;
    Some(bytes)
}

/// "MM:SS" or "HH:MM:SS" -> seconds
fn parse_clock(clock: &str) -> Option<f64> {
    let mut seconds = 0u64;
    for part in clock.split(':') {
        let n: u64 = part.parse().ok()?;
        seconds = seconds * 60 + n;
    }
    #[allow(clippy::cast_precision_loss)]
    let seconds = seconds as f64;
    Some(seconds)
}

/// Shape of the engine's `-J` metadata dump (only the fields we use)
#[derive(Debug, Deserialize)]
struct RawInfo {
    #[serde(default)]
    title: String,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    view_count: Option<u64>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    formats: Vec<MediaFormat>,
}

impl From<RawInfo> for MediaMetadata {
    fn from(raw: RawInfo) -> Self {
        Self {
            title: raw.title,
            thumbnail: raw.thumbnail.unwrap_or_default(),
            duration: raw.duration.unwrap_or(0.0),
            channel: raw.channel.or(raw.uploader).unwrap_or_default(),
            views: raw.view_count.unwrap_or(0),
            description: raw.description.unwrap_or_default(),
            formats: raw.formats,
        }
    }
}
