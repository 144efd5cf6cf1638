//! Output formatting for text and JSON.

use anyhow::Result;
use serde::Serialize;
use tabled::builder::Builder;
use time::OffsetDateTime;
use time::macros::format_description;

use insight_ai::{AiSettings, Analysis, Provider};
use insight_core::{DateRange, HistoryStats, Thresholds};
use insight_types::{
    Channel, Device, DeviceStatus, Notification, ProtocolCatalog, ProtocolInfo, Reading,
};

use crate::style;

/// Formatting options shared by all commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
    /// Use compact JSON output (no pretty-printing).
    pub compact: bool,
}

/// Serialize `value` as one JSON document followed by a newline.
pub fn format_json<T: Serialize + ?Sized>(value: &T, opts: &FormatOptions) -> Result<String> {
    let json = if opts.compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    Ok(format!("{json}\n"))
}

fn clock(time: OffsetDateTime) -> String {
    time.format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| "--:--:--".to_string())
}

fn stamp(time: OffsetDateTime) -> String {
    time.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_else(|_| "Unknown".to_string())
}

/// Device table for the `devices` command.
pub fn format_devices_text(devices: &[Device], thresholds: &Thresholds, opts: &FormatOptions) -> String {
    if devices.is_empty() {
        return "No devices configured.\n".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record([
        "ID",
        "Name",
        "Protocol",
        "Status",
        "Connection",
        "Temperature",
        "Pressure",
        "Vibration",
    ]);
    for device in devices {
        let mut row = vec![
            device.id.clone(),
            device.name.clone(),
            device.protocol.clone(),
            style::status_colored(device.status, opts.no_color),
            style::connection_colored(device.connection, opts.no_color),
        ];
        row.extend(
            Channel::ALL
                .iter()
                .map(|&c| style::channel_colored(&device.current, c, thresholds, opts.no_color)),
        );
        builder.push_record(row);
    }

    let mut table = builder.build();
    style::apply_table_style(&mut table);
    format!("{} ({}):\n{}\n", style::heading("Devices", opts.no_color), devices.len(), table)
}

/// One line per reading in `watch`.
pub fn format_reading_line(
    name: &str,
    reading: &Reading,
    status: DeviceStatus,
    thresholds: &Thresholds,
    opts: &FormatOptions,
) -> String {
    let channels: Vec<String> = Channel::ALL
        .iter()
        .map(|&c| style::channel_colored(reading, c, thresholds, opts.no_color))
        .collect();
    format!(
        "[{}] {:<22} {} | {}\n",
        style::dimmed(&clock(reading.time), opts.no_color),
        name,
        channels.join(" | "),
        style::status_colored(status, opts.no_color)
    )
}

/// One line per notification.
pub fn format_notification_line(notification: &Notification, opts: &FormatOptions) -> String {
    format!(
        "[{}] {} {}: {}\n",
        style::dimmed(&clock(notification.timestamp), opts.no_color),
        style::alert_colored(notification.level, opts.no_color),
        notification.device_name,
        notification.message
    )
}

/// Log view and statistics for the `history` command.
pub fn format_history_text(
    device: &Device,
    range: &DateRange,
    readings: &[Reading],
    stats: Option<&HistoryStats>,
    opts: &FormatOptions,
) -> String {
    let mut output = format!(
        "{} {} ({}) from {} to {}\n\n",
        style::heading("History for", opts.no_color),
        device.name,
        device.id,
        range.start,
        range.end
    );

    let Some(stats) = stats else {
        output.push_str("No readings in this range.\n");
        return output;
    };

    let mut builder = Builder::default();
    builder.push_record(["Channel", "Min", "Avg", "Max"]);
    for channel in Channel::ALL {
        let s = stats.channel(channel);
        let unit = channel.unit();
        builder.push_record([
            channel.to_string(),
            format!("{:.2} {unit}", s.min),
            format!("{:.2} {unit}", s.avg),
            format!("{:.2} {unit}", s.max),
        ]);
    }
    let mut table = builder.build();
    style::apply_table_style(&mut table);
    output.push_str(&format!("Statistics over {} readings:\n{}\n\n", stats.count, table));

    let mut builder = Builder::default();
    builder.push_record(["Timestamp", "Temperature", "Pressure", "Vibration"]);
    for r in readings {
        builder.push_record([
            stamp(r.time),
            format!("{:.2}", r.temperature),
            format!("{:.2}", r.pressure),
            format!("{:.2}", r.vibration),
        ]);
    }
    let mut table = builder.build();
    style::apply_table_style(&mut table);
    output.push_str(&format!("Log (newest first):\n{}\n", table));
    output
}

/// Protocol catalog overview.
pub fn format_protocols_text(catalog: &ProtocolCatalog, opts: &FormatOptions) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Protocol", "Fields", "Description"]);
    for info in catalog.iter() {
        let fields: Vec<&str> = info.fields.iter().map(|f| f.name.as_str()).collect();
        builder.push_record([info.name.clone(), fields.join(", "), info.description.clone()]);
    }
    let mut table = builder.build();
    style::apply_table_style(&mut table);
    format!("{} ({}):\n{}\n", style::heading("Protocols", opts.no_color), catalog.len(), table)
}

/// Connection fields of one protocol.
pub fn format_protocol_text(info: &ProtocolInfo, opts: &FormatOptions) -> String {
    let mut output = format!(
        "{}\n{}\n\n",
        style::heading(&info.name, opts.no_color),
        info.description
    );
    if info.fields.is_empty() {
        output.push_str("No connection fields.\n");
        return output;
    }

    let mut builder = Builder::default();
    builder.push_record(["Field", "Label", "Kind", "Hint"]);
    for field in &info.fields {
        let hint = if field.options.is_empty() {
            field.placeholder.clone().unwrap_or_default()
        } else {
            field.options.join(" / ")
        };
        builder.push_record([
            field.name.clone(),
            field.label.clone(),
            format!("{:?}", field.kind).to_lowercase(),
            hint,
        ]);
    }
    let mut table = builder.build();
    style::apply_table_style(&mut table);
    output.push_str(&format!("{}\n", table));
    output
}

/// Predictive maintenance report.
pub fn format_analysis_text(device: &Device, analysis: &Analysis, opts: &FormatOptions) -> String {
    let mut output = format!(
        "{} {} ({})\n\nRisk level: {}\n\n{}\n{}\n\n{}\n",
        style::heading("Predictive maintenance for", opts.no_color),
        device.name,
        device.id,
        style::risk_colored(analysis.risk_level, opts.no_color),
        style::heading("Prediction", opts.no_color),
        analysis.prediction,
        style::heading("Recommendations", opts.no_color),
    );
    for recommendation in &analysis.recommendations {
        output.push_str(&format!("  - {}\n", recommendation));
    }
    output
}

/// AI settings with keys already masked.
pub fn format_settings_text(settings: &AiSettings, path: &std::path::Path, opts: &FormatOptions) -> String {
    let mut builder = Builder::default();
    builder.push_record(["", "Provider", "Model", "API key", "Base URL"]);
    for provider in Provider::ALL {
        let s = settings.get(provider);
        let key = if s.api_key.is_empty() {
            style::dimmed("not set", opts.no_color)
        } else {
            s.api_key.clone()
        };
        builder.push_record([
            if provider == settings.provider { "*" } else { "" }.to_string(),
            provider.label().to_string(),
            s.model.clone(),
            key,
            s.base_url.clone().unwrap_or_default(),
        ]);
    }
    let mut table = builder.build();
    style::apply_table_style(&mut table);
    format!(
        "{} {}\n{}\n{}\n",
        style::heading("Active provider:", opts.no_color),
        settings.provider.label(),
        table,
        style::dimmed(&format!("Settings file: {}", path.display()), opts.no_color)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight_ai::RiskLevel;
    use insight_types::{AlertLevel, DeviceSpec};
    use time::macros::{date, datetime};

    fn plain() -> FormatOptions {
        FormatOptions {
            no_color: true,
            compact: false,
        }
    }

    fn device() -> Device {
        Device::new(
            DeviceSpec::new("pmp-003", "Coolant Pump Gamma", "Modbus RTU"),
            Reading::clamped(datetime!(2024-03-02 08:15:00 UTC), 78.0, 182.0, 3.6),
        )
    }

    #[test]
    fn test_json_compact_and_pretty() {
        let value = serde_json::json!({"a": 1});
        assert_eq!(
            format_json(&value, &FormatOptions { no_color: true, compact: true }).unwrap(),
            "{\"a\":1}\n"
        );
        assert!(format_json(&value, &plain()).unwrap().contains("\n  \"a\": 1"));
    }

    #[test]
    fn test_devices_table() {
        let out = format_devices_text(&[device()], &Thresholds::default(), &plain());
        assert!(out.starts_with("Devices (1):"));
        assert!(out.contains("Coolant Pump Gamma"));
        assert!(out.contains("182.0 PSI"));
        assert!(format_devices_text(&[], &Thresholds::default(), &plain()).contains("No devices"));
    }

    #[test]
    fn test_reading_line() {
        let d = device();
        let line = format_reading_line(
            &d.name,
            &d.current,
            DeviceStatus::Warning,
            &Thresholds::default(),
            &plain(),
        );
        assert!(line.starts_with("[08:15:00] Coolant Pump Gamma"));
        assert!(line.ends_with("| Warning\n"));
    }

    #[test]
    fn test_notification_line() {
        let n = Notification::status_changed(
            "pmp-003",
            "Coolant Pump Gamma",
            AlertLevel::Critical,
            datetime!(2024-03-02 09:00:00 UTC),
        );
        assert_eq!(
            format_notification_line(&n, &plain()),
            "[09:00:00] CRITICAL Coolant Pump Gamma: Status changed to Critical.\n"
        );
    }

    #[test]
    fn test_history_without_readings() {
        let range = DateRange::new(date!(2024-01-01), date!(2024-01-07));
        let out = format_history_text(&device(), &range, &[], None, &plain());
        assert!(out.contains("from 2024-01-01 to 2024-01-07"));
        assert!(out.contains("No readings in this range."));
    }

    #[test]
    fn test_analysis_report() {
        let analysis = Analysis {
            risk_level: RiskLevel::High,
            prediction: "Seal failure likely".into(),
            recommendations: vec!["Replace seals".into(), "Reduce load".into()],
        };
        let out = format_analysis_text(&device(), &analysis, &plain());
        assert!(out.contains("Risk level: High"));
        assert!(out.contains("  - Replace seals\n  - Reduce load\n"));
    }

    #[test]
    fn test_protocol_fields() {
        let catalog = ProtocolCatalog::default();
        let out = format_protocol_text(catalog.get("Modbus RTU").unwrap(), &plain());
        assert!(out.contains("Modbus RTU"));
        assert!(format_protocols_text(&catalog, &plain()).starts_with("Protocols (6):"));
    }
}
