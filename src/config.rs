//! Configuration types for media-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level service configuration
///
/// Every field has a sensible default, so `Config::default()` works out of
/// the box and a TOML config file only needs to name what it overrides.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Directory where finished artifacts are written (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Extraction engine configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Retry policy for transient file-access contention during finalization
    #[serde(default)]
    pub retry: RetryConfig,

    /// Maximum number of jobs executing concurrently; submissions beyond
    /// this wait in `starting` (default: 4)
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// How long terminal job records stay in the registry before the sweep
    /// task evicts them; 0 disables eviction (default: 1 hour)
    #[serde(default = "default_job_ttl", with = "duration_serde")]
    pub job_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            download_dir: default_download_dir(),
            engine: EngineConfig::default(),
            retry: RetryConfig::default(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            job_ttl: default_job_ttl(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })
    }
}

/// HTTP server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (default: 0.0.0.0:5000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins; "*" allows any (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Serve interactive Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Extraction engine (yt-dlp) configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine binary to invoke (default: "yt-dlp", resolved via PATH)
    #[serde(default = "default_engine_binary")]
    pub binary: String,

    /// Cookie file locations checked in priority order; the first existing
    /// path is passed to the engine for restricted-content requests
    #[serde(default = "default_cookie_paths")]
    pub cookie_paths: Vec<PathBuf>,

    /// Retry counts handed through to the engine itself for network,
    /// file-access, and fragment retries (default: 10)
    #[serde(default = "default_engine_retries")]
    pub engine_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: default_engine_binary(),
            cookie_paths: default_cookie_paths(),
            engine_retries: default_engine_retries(),
        }
    }
}

/// Retry policy configuration for the runner's download attempts
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0, giving 1s then 2s)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }
}

fn default_bind_address() -> SocketAddr {
    // Matches the port the service has always listened on
    "0.0.0.0:5000".parse().unwrap_or_else(|_| {
        SocketAddr::from(([0, 0, 0, 0], 5000))
    })
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_engine_binary() -> String {
    "yt-dlp".to_string()
}

fn default_cookie_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/etc/secrets/cookies.txt"),
        PathBuf::from("cookies.txt"),
    ]
}

fn default_engine_retries() -> u32 {
    10
}

fn default_max_concurrent_jobs() -> usize {
    4
}

fn default_job_ttl() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
