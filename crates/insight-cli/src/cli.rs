//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use insight_ai::Provider;
use insight_core::Mode;

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Service configuration shared by commands that run the monitor in-process
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Path to the service configuration file
    #[arg(short, long, global = true, env = "FACTORY_INSIGHT_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Reusable output arguments
#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Parser)]
#[command(name = "factory-insight")]
#[command(author, version, about = "Factory floor monitoring with AI-assisted maintenance", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output compact JSON (no pretty-printing)
    #[arg(long, global = true)]
    pub compact: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the update cycle and print readings and alerts as they happen
    Watch {
        /// Update interval in milliseconds (overrides config)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Mode to run in: simulation or live (overrides config)
        #[arg(short, long)]
        mode: Option<Mode>,

        /// Only print readings for this device
        #[arg(short, long)]
        device: Option<String>,

        /// Stop after this many update cycles (0 for unlimited)
        #[arg(short = 'n', long, default_value = "0")]
        count: u32,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List the configured devices
    Devices {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// List supported protocols and their connection fields
    Protocols {
        /// Show the connection fields of one protocol
        name: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Simulate a run of update cycles and explore one device's history
    History {
        /// Device ID
        device: String,

        /// Update cycles to simulate before exploring
        #[arg(short, long, default_value = "30")]
        ticks: u32,

        /// First day to include (YYYY-MM-DD, default one week ago)
        #[arg(long)]
        start: Option<String>,

        /// Last day to include (YYYY-MM-DD, default today)
        #[arg(long)]
        end: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Ask the configured AI provider for a predictive maintenance report
    Analyze {
        /// Device ID
        device: String,

        /// Update cycles to simulate before analyzing
        #[arg(short, long, default_value = "0")]
        ticks: u32,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Chat with the maintenance assistant about the factory floor
    Chat {
        /// Send a single message instead of starting an interactive session
        message: Option<String>,
    },

    /// Show or change AI provider settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },

    /// Run the HTTP service
    Serve {
        /// Bind address (overrides config)
        #[arg(short, long)]
        bind: Option<String>,

        /// Do not start the update cycle (API only mode)
        #[arg(long)]
        no_cycle: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum SettingsAction {
    /// Show all settings with keys masked
    Show {
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Select the active provider
    Provider {
        /// gemini, openai, anthropic or iotteam
        provider: Provider,
    },
    /// Set a provider's API key
    Key {
        /// Provider to configure (default: the active one)
        #[arg(short, long)]
        provider: Option<Provider>,
        /// API key; empty clears it
        key: String,
    },
    /// Set a provider's model
    Model {
        #[arg(short, long)]
        provider: Option<Provider>,
        model: String,
    },
    /// Set a provider's base URL
    BaseUrl {
        #[arg(short, long)]
        provider: Option<Provider>,
        url: String,
    },
    /// Print the settings file location
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_watch() {
        let cli = Cli::try_parse_from([
            "factory-insight",
            "watch",
            "--interval",
            "500",
            "--mode",
            "live",
            "-n",
            "3",
            "--format",
            "json",
        ])
        .unwrap();
        match cli.command {
            Commands::Watch {
                interval,
                mode,
                count,
                output,
                ..
            } => {
                assert_eq!(interval, Some(500));
                assert_eq!(mode, Some(Mode::Live));
                assert_eq!(count, 3);
                assert_eq!(output.format, OutputFormat::Json);
            }
            _ => panic!("expected watch"),
        }
    }

    #[test]
    fn test_parse_settings_key() {
        let cli = Cli::try_parse_from([
            "factory-insight",
            "settings",
            "key",
            "--provider",
            "openai",
            "sk-123",
        ])
        .unwrap();
        match cli.command {
            Commands::Settings {
                action: Some(SettingsAction::Key { provider, key }),
            } => {
                assert_eq!(provider, Some(Provider::OpenAi));
                assert_eq!(key, "sk-123");
            }
            _ => panic!("expected settings key"),
        }
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["factory-insight", "watch", "--mode", "turbo"]).is_err());
    }
}
