//! Watch command implementation.
//!
//! Runs the update cycle in-process and prints every reading, connection
//! change and notification the monitor publishes. Text output goes one line
//! per reading; JSON output is one event per line.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use owo_colors::OwoColorize;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::MissedTickBehavior;

use insight_core::{EventReceiver, MonitorEvent, Thresholds};
use insight_service::Config;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_notification_line, format_reading_line};
use crate::util::{append_output, local_state};

/// Arguments for the watch command.
pub struct WatchArgs<'a> {
    pub config: Config,
    pub device: Option<String>,
    pub count: u32,
    pub format: OutputFormat,
    pub output: Option<&'a PathBuf>,
    pub quiet: bool,
    pub opts: &'a FormatOptions,
}

pub async fn cmd_watch(args: WatchArgs<'_>) -> Result<()> {
    let WatchArgs {
        config,
        device,
        count,
        format,
        output,
        quiet,
        opts,
    } = args;
    let interval = config.cycle.interval();

    let state = local_state(config, 0).await?;
    let (mut rx, names, thresholds, mode) = {
        let monitor = state.monitor.lock().await;
        if let Some(id) = &device {
            monitor.device(id)?;
        }
        let names: HashMap<String, String> = monitor
            .devices()
            .iter()
            .map(|d| (d.id.clone(), d.name.clone()))
            .collect();
        (
            monitor.subscribe(),
            names,
            monitor.thresholds().clone(),
            monitor.mode(),
        )
    };

    if !quiet {
        let target = match &device {
            Some(id) => id.clone(),
            None => format!("{} devices", names.len()),
        };
        let header = if opts.no_color {
            format!("Watching: {} ({} mode)", target, mode)
        } else {
            format!("Watching: {} ({} mode)", target.green(), mode.cyan())
        };
        eprintln!("{}", header);
        if count > 0 {
            eprintln!(
                "Interval: {}ms | Count: {} | Press Ctrl+C to stop",
                interval.as_millis(),
                count
            );
        } else {
            eprintln!("Interval: {}ms | Press Ctrl+C to stop", interval.as_millis());
        }
        eprintln!("{}", "-".repeat(60));
    }

    let printer = EventPrinter {
        device: device.as_deref(),
        names: &names,
        thresholds: &thresholds,
        format,
        output,
        opts,
    };

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut cycles: u32 = 0;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nShutting down...");
                return Ok(());
            }
            _ = ticker.tick() => {}
        }

        state.monitor.lock().await.tick().await;
        printer.drain(&mut rx)?;

        cycles += 1;
        if count > 0 && cycles >= count {
            if !quiet {
                eprintln!("Completed {} update cycles.", cycles);
            }
            return Ok(());
        }
    }
}

struct EventPrinter<'a> {
    device: Option<&'a str>,
    names: &'a HashMap<String, String>,
    thresholds: &'a Thresholds,
    format: OutputFormat,
    output: Option<&'a PathBuf>,
    opts: &'a FormatOptions,
}

impl EventPrinter<'_> {
    /// Print every event published since the last call.
    fn drain(&self, rx: &mut EventReceiver) -> Result<()> {
        loop {
            match rx.try_recv() {
                Ok(event) => self.print(&event)?,
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("Output fell behind, {} events dropped", skipped);
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return Ok(()),
            }
        }
    }

    fn print(&self, event: &MonitorEvent) -> Result<()> {
        if let (Some(target), Some(id)) = (self.device, event.device_id())
            && target != id
        {
            return Ok(());
        }

        if self.format == OutputFormat::Json {
            return append_output(self.output, &format!("{}\n", serde_json::to_string(event)?));
        }

        match event {
            MonitorEvent::Reading { device_id, reading } => {
                let name = self.names.get(device_id).unwrap_or(device_id);
                let status = self.thresholds.evaluate(reading);
                append_output(
                    self.output,
                    &format_reading_line(name, reading, status, self.thresholds, self.opts),
                )
            }
            MonitorEvent::Notification { notification } => {
                append_output(self.output, &format_notification_line(notification, self.opts))
            }
            MonitorEvent::ConnectionChanged {
                device_id,
                status,
                error,
            } => {
                match error {
                    Some(e) => eprintln!("{}: {} ({})", device_id, status, e),
                    None => eprintln!("{}: {}", device_id, status),
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight_core::EventDispatcher;
    use insight_types::Reading;

    #[test]
    fn test_drain_writes_matching_device_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watch.jsonl");
        let names = HashMap::new();
        let thresholds = Thresholds::default();
        let opts = FormatOptions::default();
        let printer = EventPrinter {
            device: Some("pmp-003"),
            names: &names,
            thresholds: &thresholds,
            format: OutputFormat::Json,
            output: Some(&path),
            opts: &opts,
        };

        let events = EventDispatcher::default();
        let mut rx = events.subscribe();
        events.send(MonitorEvent::Reading {
            device_id: "pmp-003".into(),
            reading: Reading::now(70.0, 150.0, 2.0),
        });
        events.send(MonitorEvent::DeviceRemoved {
            device_id: "cnc-001".into(),
        });
        printer.drain(&mut rx).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"type\":\"reading\""));
        assert!(written.contains("pmp-003"));
        assert!(!written.contains("cnc-001"));
    }
}
