//! stackbeatd — heartbeat agent for a docker compose project.
//!
//! Polls the project's containers on a fixed interval and pings a
//! dead-man's-switch endpoint: the base URL when every service runs, and
//! `<base>/fail` once enough consecutive polls have failed.
//!
//! # Usage
//!
//! ```text
//! PROJECT_IDENTITY=shop HEALTHCHECK_BASE_URL=https://hc-ping.com/<uuid> stackbeatd
//! stackbeatd --project shop --ping-url https://hc-ping.com/<uuid> --ignore backup,cron
//! ```

mod signals;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio::sync::watch;
use tracing::info;

use stackbeat_core::{RawSettings, Settings};
use stackbeat_docker::DockerInventory;
use stackbeat_health::Poller;
use stackbeat_notify::HttpSink;

#[derive(Parser)]
#[command(name = "stackbeatd", about = "Compose project heartbeat agent", version)]
struct Cli {
    /// Compose project to watch.
    #[arg(long, env = "PROJECT_IDENTITY")]
    project: Option<String>,

    /// Seconds between polls (default 60).
    #[arg(long, env = "POLL_INTERVAL_SECONDS", allow_hyphen_values = true)]
    interval: Option<String>,

    /// Heartbeat base URL; failures are sent to <url>/fail.
    #[arg(long, env = "HEALTHCHECK_BASE_URL")]
    ping_url: Option<String>,

    /// Services to leave out, separated by commas or semicolons.
    #[arg(long, env = "IGNORE_SERVICES")]
    ignore: Option<String>,

    /// Consecutive failing polls before a failure ping (default 0).
    #[arg(long, env = "ERROR_THRESHOLD", allow_hyphen_values = true)]
    error_threshold: Option<String>,

    /// TOML file providing defaults for the options above.
    #[arg(long, env = "STACKBEAT_CONFIG")]
    config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let settings = resolve_settings(&cli, |key| std::env::var(key).ok())?;
    info!(
        project = %settings.project,
        ping_url = %settings.targets.success,
        fail_url = %settings.targets.failure,
        ignore = %settings.ignore,
        interval_secs = settings.interval.as_secs(),
        error_threshold = settings.error_threshold,
        "configuration loaded"
    );

    run(settings).await
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Merge command line / environment, legacy variables, and the config file.
fn resolve_settings<F>(cli: &Cli, lookup: F) -> anyhow::Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let primary = RawSettings {
        project: cli.project.clone(),
        interval: cli.interval.clone(),
        ping_url: cli.ping_url.clone(),
        ignore: cli.ignore.clone(),
        error_threshold: cli.error_threshold.clone(),
    };
    let legacy = RawSettings::from_legacy_env(lookup);
    let file = match &cli.config {
        Some(path) => RawSettings::from_file(path)?,
        None => RawSettings::default(),
    };

    Ok(primary.or(legacy).or(file).resolve()?)
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    let inventory = DockerInventory::connect()
        .await
        .context("failed to connect to docker")?;
    info!("docker client initialized");

    let sink = HttpSink::new().context("failed to build tls client config")?;

    let signals = signals::ShutdownSignals::install().context("failed to install signal handlers")?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal_handle = tokio::spawn(signals::forward(signals, shutdown_tx));

    let poller = Poller::new(&settings, Arc::new(inventory), Arc::new(sink));
    let summary = poller.run(shutdown_rx).await;

    signal_handle.abort();
    info!(cycles = summary.cycles, "stackbeatd stopped");
    Ok(())
}
