//! Devices command implementation.

use std::path::PathBuf;

use anyhow::Result;

use insight_service::Config;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_devices_text, format_json};
use crate::util::{local_state, write_output};

pub async fn cmd_devices(
    config: Config,
    format: OutputFormat,
    output: Option<&PathBuf>,
    opts: &FormatOptions,
) -> Result<()> {
    let state = local_state(config, 0).await?;
    let monitor = state.monitor.lock().await;

    let content = match format {
        OutputFormat::Json => format_json(monitor.devices(), opts)?,
        OutputFormat::Text => format_devices_text(monitor.devices(), monitor.thresholds(), opts),
    };
    write_output(output, &content)
}
