//! Analyze command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};

use insight_ai::{analyze_device, backend_for};
use insight_service::Config;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_analysis_text, format_json};
use crate::util::{local_state, write_output};

/// Arguments for the analyze command.
pub struct AnalyzeArgs<'a> {
    pub config: Config,
    pub device: String,
    pub ticks: u32,
    pub format: OutputFormat,
    pub output: Option<&'a PathBuf>,
    pub opts: &'a FormatOptions,
}

pub async fn cmd_analyze(args: AnalyzeArgs<'_>) -> Result<()> {
    let AnalyzeArgs {
        config,
        device,
        ticks,
        format,
        output,
        opts,
    } = args;

    let state = local_state(config, ticks).await?;
    let device = state.monitor.lock().await.device(&device)?.clone();
    let settings = state.ai.read().await.effective();

    let backend = backend_for(&settings, state.http.clone())
        .context("AI provider is not configured; see `factory-insight settings`")?;
    tracing::info!("Requesting analysis from {}", settings.provider.label());
    let analysis = analyze_device(backend.as_ref(), &device)
        .await
        .with_context(|| format!("Analysis of {} failed", device.id))?;

    let content = match format {
        OutputFormat::Json => format_json(&analysis, opts)?,
        OutputFormat::Text => format_analysis_text(&device, &analysis, opts),
    };
    write_output(output, &content)
}
