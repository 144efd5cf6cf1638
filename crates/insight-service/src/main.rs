//! Factory insight service: update cycle and HTTP API.
//!
//! Run with: `cargo run -p insight-service`

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use insight_core::Mode;
use insight_service::Config;

/// Factory insight service - update cycle and HTTP REST API.
#[derive(Parser, Debug)]
#[command(name = "insight-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long)]
    bind: Option<String>,

    /// Update interval in milliseconds (overrides config).
    #[arg(short, long)]
    interval: Option<u64>,

    /// Starting mode: simulation or live (overrides config).
    #[arg(short, long)]
    mode: Option<Mode>,

    /// Do not start the update cycle (API only mode).
    #[arg(long)]
    no_cycle: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("insight_service=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default().unwrap_or_default(),
    };

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(interval) = args.interval {
        config.cycle.interval_ms = interval;
    }
    if let Some(mode) = args.mode {
        config.cycle.mode = mode;
    }
    if args.no_cycle {
        info!("Update cycle disabled");
        config.cycle.autostart = false;
    }

    insight_service::serve(config).await
}
