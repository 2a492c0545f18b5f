//! # occudash
//!
//! Headless runner for the occupancy dashboard sync engine. Polls the
//! configured backend and reports every display update through tracing.
//! On Unix, SIGUSR1 pauses polling and SIGUSR2 resumes it, standing in for
//! the dashboard's visibility events.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

use lib_sync::{
    loggers, EngineConfig, HttpSourceClient, SyncEngine, TracingChartSink, TracingDisplaySink,
    Visibility,
};

#[derive(Debug, Parser)]
#[command(name = "occudash", version, about = "Occupancy dashboard sync engine")]
struct Cli {
    /// Path to a JSON configuration file.
    #[arg(long, env = "OCCUDASH_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL, overriding the configured one.
    #[arg(long, env = "OCCUDASH_BASE_URL")]
    base_url: Option<String>,

    /// Camera id to poll on the fast cycle. Repeatable.
    #[arg(long = "camera")]
    cameras: Vec<String>,

    /// Branch id to poll on the slow cycle. Repeatable.
    #[arg(long = "branch")]
    branches: Vec<String>,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn build_config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => {
                let mut config = EngineConfig::default();
                config.apply_env_overrides()?;
                config
            }
        };
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if !self.cameras.is_empty() {
            config.cameras = self.cameras.clone();
        }
        if !self.branches.is_empty() {
            config.branches = self.branches.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    loggers::init(cli.verbose);

    let config = cli.build_config()?;
    if config.cameras.is_empty() && config.branches.is_empty() {
        anyhow::bail!("nothing to poll: configure at least one camera or branch");
    }
    info!(
        base_url = %config.base_url,
        cameras = config.cameras.len(),
        branches = config.branches.len(),
        "starting sync engine"
    );

    let client = Arc::new(HttpSourceClient::new(&config.base_url)?);
    let engine = SyncEngine::bootstrap(
        &config,
        client,
        Arc::new(TracingDisplaySink),
        Arc::new(TracingChartSink),
    )?;

    let (visibility_tx, visibility_rx) = mpsc::channel(8);
    spawn_visibility_signals(visibility_tx);

    tokio::select! {
        _ = engine.run(visibility_rx) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
        }
    }
    Ok(())
}

/// Translates SIGUSR1/SIGUSR2 into hidden/visible lifecycle events.
#[cfg(unix)]
fn spawn_visibility_signals(tx: mpsc::Sender<Visibility>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut pause = match signal(SignalKind::user_defined1()) {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!(error = %err, "SIGUSR1 handler unavailable");
                return;
            }
        };
        let mut resume = match signal(SignalKind::user_defined2()) {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!(error = %err, "SIGUSR2 handler unavailable");
                return;
            }
        };
        loop {
            let event = tokio::select! {
                _ = pause.recv() => Visibility::Hidden,
                _ = resume.recv() => Visibility::Visible,
            };
            if tx.send(event).await.is_err() {
                return;
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_visibility_signals(_tx: mpsc::Sender<Visibility>) {}
