//! Command-line interface for the Factory Insight dashboard.
//!
//! The CLI runs the monitor in-process using the service configuration
//! (`~/.config/factory-insight/server.toml`), so every command works without
//! a running server.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `watch` | Run the update cycle and print readings and alerts |
//! | `devices` | List the configured devices |
//! | `protocols` | List protocols and their connection fields |
//! | `history` | Simulate cycles and explore one device's history |
//! | `analyze` | Predictive maintenance report from the AI provider |
//! | `chat` | Chat with the maintenance assistant |
//! | `settings` | Show or change AI provider settings |
//! | `serve` | Run the HTTP service |
//! | `completions` | Generate shell completions |
//!
//! # Environment Variables
//!
//! - `FACTORY_INSIGHT_CONFIG`: Service configuration file
//! - `GEMINI_API_KEY`: Gemini API key, used over the stored one
//! - `NO_COLOR`: Disable colored output when set

use std::io;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod format;
mod style;
mod util;

use cli::{Cli, Commands};
use commands::*;
use format::FormatOptions;
use util::load_config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        let default = match cli.command {
            Commands::Serve { .. } => "insight_service=info,tower_http=debug",
            _ => "warn",
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let opts = FormatOptions {
        no_color: cli.no_color,
        compact: cli.compact,
    };
    let output = cli.output.as_ref();
    let config_path = cli.config.config.as_deref();

    match cli.command {
        Commands::Watch {
            interval,
            mode,
            device,
            count,
            output: out,
        } => {
            let mut config = load_config(config_path)?;
            if let Some(interval) = interval {
                config.cycle.interval_ms = interval;
            }
            if let Some(mode) = mode {
                config.cycle.mode = mode;
            }
            config.validate()?;
            cmd_watch(WatchArgs {
                config,
                device,
                count,
                format: out.format,
                output,
                quiet: cli.quiet,
                opts: &opts,
            })
            .await?;
        }
        Commands::Devices { output: out } => {
            cmd_devices(load_config(config_path)?, out.format, output, &opts).await?;
        }
        Commands::Protocols { name, output: out } => {
            cmd_protocols(name.as_deref(), out.format, output, &opts)?;
        }
        Commands::History {
            device,
            ticks,
            start,
            end,
            output: out,
        } => {
            cmd_history(HistoryArgs {
                config: load_config(config_path)?,
                device,
                ticks,
                start,
                end,
                format: out.format,
                output,
                opts: &opts,
            })
            .await?;
        }
        Commands::Analyze {
            device,
            ticks,
            output: out,
        } => {
            cmd_analyze(AnalyzeArgs {
                config: load_config(config_path)?,
                device,
                ticks,
                format: out.format,
                output,
                opts: &opts,
            })
            .await?;
        }
        Commands::Chat { message } => {
            cmd_chat(load_config(config_path)?, message, &opts).await?;
        }
        Commands::Settings { action } => {
            let path = load_config(config_path)?.ai.settings_path();
            cmd_settings(path, action, output, &opts)?;
        }
        Commands::Serve { bind, no_cycle } => {
            cmd_serve(load_config(config_path)?, bind, no_cycle).await?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "factory-insight", &mut io::stdout());
        }
    }

    Ok(())
}
