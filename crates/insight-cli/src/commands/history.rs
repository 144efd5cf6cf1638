//! History command implementation.
//!
//! History lives in memory only, so the command first simulates `ticks`
//! update cycles and then explores the result like the dashboard's history
//! explorer: a day range, a newest-first log and per-channel statistics.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use time::{Date, OffsetDateTime};

use insight_core::explorer::log_view;
use insight_core::{DateRange, HistoryStats};
use insight_service::Config;
use insight_types::Reading;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_history_text, format_json};
use crate::util::{local_state, write_output};

/// Arguments for the history command.
pub struct HistoryArgs<'a> {
    pub config: Config,
    pub device: String,
    pub ticks: u32,
    pub start: Option<String>,
    pub end: Option<String>,
    pub format: OutputFormat,
    pub output: Option<&'a PathBuf>,
    pub opts: &'a FormatOptions,
}

#[derive(Serialize)]
struct HistoryReport<'a> {
    device_id: &'a str,
    start: String,
    end: String,
    readings: &'a [Reading],
    stats: Option<HistoryStats>,
}

/// Resolve the day range, defaulting to the week ending `today`.
fn resolve_range(start: Option<&str>, end: Option<&str>, today: Date) -> Result<DateRange> {
    let default = DateRange::last_week(today);
    let parse = |s: &str| {
        DateRange::parse_day(s)
            .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD", s))
    };
    let start = start.map(parse).transpose()?.unwrap_or(default.start);
    let end = end.map(parse).transpose()?.unwrap_or(default.end);
    if start > end {
        bail!("Start date {} is after end date {}", start, end);
    }
    Ok(DateRange::new(start, end))
}

pub async fn cmd_history(args: HistoryArgs<'_>) -> Result<()> {
    let HistoryArgs {
        config,
        device,
        ticks,
        start,
        end,
        format,
        output,
        opts,
    } = args;

    // Parse date filters upfront to fail fast
    let range = resolve_range(
        start.as_deref(),
        end.as_deref(),
        OffsetDateTime::now_utc().date(),
    )?;

    let state = local_state(config, ticks).await?;
    let monitor = state.monitor.lock().await;
    let device = monitor.device(&device)?;
    let readings = log_view(&device.history, &range);
    let stats = HistoryStats::compute(&readings);

    let content = match format {
        OutputFormat::Json => format_json(
            &HistoryReport {
                device_id: &device.id,
                start: range.start.to_string(),
                end: range.end.to_string(),
                readings: &readings,
                stats,
            },
            opts,
        )?,
        OutputFormat::Text => format_history_text(device, &range, &readings, stats.as_ref(), opts),
    };
    write_output(output, &content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn test_default_range_is_last_week() {
        let range = resolve_range(None, None, date!(2024-03-10)).unwrap();
        assert_eq!(range.start, date!(2024-03-03));
        assert_eq!(range.end, date!(2024-03-10));
    }

    #[test]
    fn test_explicit_range() {
        let range = resolve_range(Some("2024-01-01"), Some("2024-01-31"), date!(2024-03-10)).unwrap();
        assert_eq!(range, DateRange::new(date!(2024-01-01), date!(2024-01-31)));
    }

    #[test]
    fn test_invalid_ranges() {
        let today = date!(2024-03-10);
        assert!(resolve_range(Some("yesterday"), None, today).is_err());
        let err = resolve_range(Some("2024-02-02"), Some("2024-02-01"), today).unwrap_err();
        assert!(err.to_string().contains("after end date"));
    }
}
