//! media-dl server binary.

use clap::Parser;
use media_dl::{Config, Error, JobRunner, Result, YtDlpEngine, spawn_eviction_sweeper};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Self-hosted media download service
#[derive(Debug, Parser)]
#[command(name = "media-dl", version, about)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address, overriding the config file
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Download directory, overriding the config file
    #[arg(short, long)]
    download_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }
    if let Some(dir) = args.download_dir {
        config.download_dir = dir;
    }
    let config = Arc::new(config);

    std::fs::create_dir_all(&config.download_dir).map_err(|e| Error::Config {
        message: format!(
            "cannot create download directory {}: {e}",
            config.download_dir.display()
        ),
        key: Some("download_dir".to_string()),
    })?;

    tracing::info!(
        download_dir = %config.download_dir.display(),
        engine = %config.engine.binary,
        "Starting media-dl"
    );

    let engine = Arc::new(YtDlpEngine::new(config.engine.clone()));
    let runner = Arc::new(JobRunner::new(engine, config.clone()));

    if config.job_ttl > Duration::ZERO {
        spawn_eviction_sweeper(Arc::clone(runner.registry()), config.job_ttl);
    } else {
        tracing::info!("Job record eviction disabled (job_ttl = 0)");
    }

    tokio::select! {
        result = media_dl::api::start_api_server(runner, config) => result,
        _ = media_dl::shutdown_signal() => {
            tracing::info!("Shutdown complete");
            Ok(())
        }
    }
}
