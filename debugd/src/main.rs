//! Debug log ingestion daemon.
//!
//! Accepts JSON log entries over HTTP POST and appends them as
//! newline-delimited JSON to per-session files under the project's log
//! directory, so editor plugins, agents and browser scripts can emit
//! structured debug events without managing file handles themselves.

mod config;
mod http_server;
mod sink;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use sink::LogSink;

const DAEMON_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "debugd", version = DAEMON_VERSION)]
#[command(about = "Debug log ingestion daemon")]
struct Cli {
    /// Project directory whose log subdirectory receives the entries
    #[arg(default_value = ".")]
    project_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing();
    info!(
        "{}",
        debugd_build_info::formatted_banner("debugd", DAEMON_VERSION)
    );

    let config = config::resolve(cli.project_dir)?;

    std::fs::create_dir_all(&config.log_dir).with_context(|| {
        format!(
            "Failed to create log directory {}",
            config.log_dir.display()
        )
    })?;

    info!("  Project:  {}", config.project_dir.display());
    info!("  Endpoint: http://localhost:{}/log", config.port);
    info!("  Log dir:  {}", config.log_dir.display());

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;

    let sink = Arc::new(LogSink::new(config.log_dir.clone()));
    http_server::serve(listener, Arc::new(config), sink).await
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);

    let _ = builder.try_init();
}
