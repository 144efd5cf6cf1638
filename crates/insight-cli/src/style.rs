//! Visual styling utilities for the CLI.
//!
//! Colors follow the dashboard: green for normal, yellow for warning, red for
//! critical. Every helper takes `no_color` and returns plain text when set.

use owo_colors::OwoColorize;

use insight_ai::RiskLevel;
use insight_core::Thresholds;
use insight_types::{AlertLevel, Channel, ConnectionStatus, DeviceStatus, Reading};

/// Color a device status.
pub fn status_colored(status: DeviceStatus, no_color: bool) -> String {
    let text = status.to_string();
    if no_color {
        return text;
    }
    match status {
        DeviceStatus::Normal => text.green().to_string(),
        DeviceStatus::Warning => text.yellow().to_string(),
        DeviceStatus::Critical => text.red().bold().to_string(),
    }
}

/// Color a connection state.
pub fn connection_colored(status: ConnectionStatus, no_color: bool) -> String {
    let text = status.to_string();
    if no_color {
        return text;
    }
    match status {
        ConnectionStatus::Connected => text.green().to_string(),
        ConnectionStatus::Connecting => text.cyan().to_string(),
        ConnectionStatus::Disconnected => text.dimmed().to_string(),
        ConnectionStatus::Error => text.red().to_string(),
    }
}

/// Color an alert level.
pub fn alert_colored(level: AlertLevel, no_color: bool) -> String {
    let text = level.to_string().to_uppercase();
    if no_color {
        return text;
    }
    match level {
        AlertLevel::Warning => text.yellow().bold().to_string(),
        AlertLevel::Critical => text.red().bold().to_string(),
    }
}

/// Color a risk level.
pub fn risk_colored(risk: RiskLevel, no_color: bool) -> String {
    let text = risk.to_string();
    if no_color {
        return text;
    }
    match risk {
        RiskLevel::Low => text.green().to_string(),
        RiskLevel::Medium => text.yellow().to_string(),
        RiskLevel::High => text.red().bold().to_string(),
    }
}

/// Format one channel value with its unit, colored by its threshold band.
pub fn channel_colored(
    reading: &Reading,
    channel: Channel,
    thresholds: &Thresholds,
    no_color: bool,
) -> String {
    let value = reading.get(channel);
    let text = match channel {
        Channel::Vibration => format!("{:.2} {}", value, channel.unit()),
        _ => format!("{:.1} {}", value, channel.unit()),
    };
    if no_color {
        return text;
    }
    match thresholds.config().limits(channel).evaluate(value) {
        DeviceStatus::Normal => text,
        DeviceStatus::Warning => text.yellow().to_string(),
        DeviceStatus::Critical => text.red().to_string(),
    }
}

/// Dim secondary text such as timestamps.
pub fn dimmed(text: &str, no_color: bool) -> String {
    if no_color {
        text.to_string()
    } else {
        text.dimmed().to_string()
    }
}

/// Emphasize a heading.
pub fn heading(text: &str, no_color: bool) -> String {
    if no_color {
        text.to_string()
    } else {
        text.bold().to_string()
    }
}

/// Apply the table style used by every list command.
pub fn apply_table_style(table: &mut tabled::Table) {
    use tabled::settings::Style;
    table.with(Style::rounded());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_color_is_plain() {
        assert_eq!(status_colored(DeviceStatus::Critical, true), "Critical");
        assert_eq!(connection_colored(ConnectionStatus::Error, true), "Error");
        assert_eq!(alert_colored(AlertLevel::Warning, true), "WARNING");
        assert_eq!(risk_colored(RiskLevel::High, true), "High");
    }

    #[test]
    fn test_color_adds_escape_codes() {
        assert!(status_colored(DeviceStatus::Warning, false).contains("\u{1b}["));
    }

    #[test]
    fn test_channel_value_format() {
        let reading = Reading::now(72.04, 160.0, 2.5);
        let thresholds = Thresholds::default();
        assert_eq!(
            channel_colored(&reading, Channel::Temperature, &thresholds, true),
            "72.0 °C"
        );
        assert_eq!(
            channel_colored(&reading, Channel::Vibration, &thresholds, true),
            "2.50 G"
        );
    }
}
