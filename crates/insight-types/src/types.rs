//! Core types for factory sensor data.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ValidationError;

/// Inclusive physical range a sensor channel is clamped to.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelRange {
    /// Lowest value the channel can report.
    pub min: f64,
    /// Highest value the channel can report.
    pub max: f64,
}

impl ChannelRange {
    /// Create a new range.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp a value into this range.
    ///
    /// NaN is mapped to the lower bound so a reading can never leave its range.
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }

    /// Check whether a value lies within this range.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Temperature hard range in °C.
pub const TEMPERATURE_RANGE: ChannelRange = ChannelRange::new(20.0, 100.0);
/// Pressure hard range in PSI.
pub const PRESSURE_RANGE: ChannelRange = ChannelRange::new(50.0, 250.0);
/// Vibration hard range in G.
pub const VIBRATION_RANGE: ChannelRange = ChannelRange::new(0.0, 10.0);

/// One of the three measured sensor channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Channel {
    /// Temperature in °C.
    Temperature,
    /// Pressure in PSI.
    Pressure,
    /// Vibration in G.
    Vibration,
}

impl Channel {
    /// All channels in display order.
    pub const ALL: [Channel; 3] = [Channel::Temperature, Channel::Pressure, Channel::Vibration];

    /// Hard clamp range of this channel.
    #[must_use]
    pub fn range(&self) -> ChannelRange {
        match self {
            Channel::Temperature => TEMPERATURE_RANGE,
            Channel::Pressure => PRESSURE_RANGE,
            Channel::Vibration => VIBRATION_RANGE,
        }
    }

    /// Unit suffix used when displaying values.
    #[must_use]
    pub fn unit(&self) -> &'static str {
        match self {
            Channel::Temperature => "°C",
            Channel::Pressure => "PSI",
            Channel::Vibration => "G",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Temperature => write!(f, "Temperature"),
            Channel::Pressure => write!(f, "Pressure"),
            Channel::Vibration => write!(f, "Vibration"),
        }
    }
}

impl FromStr for Channel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temperature" | "temp" => Ok(Channel::Temperature),
            "pressure" => Ok(Channel::Pressure),
            "vibration" => Ok(Channel::Vibration),
            _ => Err(ValidationError::UnknownChannel(s.to_string())),
        }
    }
}

/// A single timestamped sample of the three sensor channels.
///
/// Construct readings through [`Reading::clamped`] to guarantee every channel
/// stays within its physical range.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// When the sample was taken.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub time: OffsetDateTime,
    /// Temperature in °C.
    pub temperature: f64,
    /// Pressure in PSI.
    pub pressure: f64,
    /// Vibration in G.
    pub vibration: f64,
}

impl Reading {
    /// Build a reading with every channel clamped to its hard range.
    ///
    /// ```
    /// use insight_types::Reading;
    /// use time::OffsetDateTime;
    ///
    /// let r = Reading::clamped(OffsetDateTime::UNIX_EPOCH, 140.0, 10.0, -1.0);
    /// assert_eq!(r.temperature, 100.0);
    /// assert_eq!(r.pressure, 50.0);
    /// assert_eq!(r.vibration, 0.0);
    /// ```
    #[must_use]
    pub fn clamped(time: OffsetDateTime, temperature: f64, pressure: f64, vibration: f64) -> Self {
        Self {
            time,
            temperature: TEMPERATURE_RANGE.clamp(temperature),
            pressure: PRESSURE_RANGE.clamp(pressure),
            vibration: VIBRATION_RANGE.clamp(vibration),
        }
    }

    /// Build a clamped reading stamped with the current time.
    #[must_use]
    pub fn now(temperature: f64, pressure: f64, vibration: f64) -> Self {
        Self::clamped(OffsetDateTime::now_utc(), temperature, pressure, vibration)
    }

    /// Value of a single channel.
    #[must_use]
    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Temperature => self.temperature,
            Channel::Pressure => self.pressure,
            Channel::Vibration => self.vibration,
        }
    }

    /// Check that every channel lies within its hard range.
    #[must_use]
    pub fn is_within_ranges(&self) -> bool {
        Channel::ALL
            .iter()
            .all(|channel| channel.range().contains(self.get(*channel)))
    }
}

/// Derived health tier of a device.
///
/// Ordered by severity: `Normal < Warning < Critical`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DeviceStatus {
    /// All channels below the warning limits.
    #[default]
    Normal,
    /// At least one channel above its warning limit.
    Warning,
    /// At least one channel above its critical limit.
    Critical,
}

impl DeviceStatus {
    /// Whether this status should raise an alert when entered from `Normal`.
    #[must_use]
    pub fn is_alert(&self) -> bool {
        matches!(self, DeviceStatus::Warning | DeviceStatus::Critical)
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceStatus::Normal => write!(f, "Normal"),
            DeviceStatus::Warning => write!(f, "Warning"),
            DeviceStatus::Critical => write!(f, "Critical"),
        }
    }
}

impl FromStr for DeviceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(DeviceStatus::Normal),
            "warning" => Ok(DeviceStatus::Warning),
            "critical" => Ok(DeviceStatus::Critical),
            _ => Err(ValidationError::UnknownStatus(s.to_string())),
        }
    }
}

/// Lifecycle state of a device's live connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConnectionStatus {
    /// No connection handle exists.
    #[default]
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// A connection handle is held and being polled.
    Connected,
    /// The last connect or fetch failed; the handle was discarded.
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Connecting => write!(f, "Connecting"),
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::Error => write!(f, "Error"),
        }
    }
}

impl FromStr for ConnectionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disconnected" => Ok(ConnectionStatus::Disconnected),
            "connecting" => Ok(ConnectionStatus::Connecting),
            "connected" => Ok(ConnectionStatus::Connected),
            "error" => Ok(ConnectionStatus::Error),
            _ => Err(ValidationError::UnknownConnectionStatus(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_ranges() {
        assert_eq!(Channel::Temperature.range(), ChannelRange::new(20.0, 100.0));
        assert_eq!(Channel::Pressure.range(), ChannelRange::new(50.0, 250.0));
        assert_eq!(Channel::Vibration.range(), ChannelRange::new(0.0, 10.0));
    }

    #[test]
    fn test_range_clamp_nan_goes_to_min() {
        assert_eq!(TEMPERATURE_RANGE.clamp(f64::NAN), 20.0);
        assert_eq!(PRESSURE_RANGE.clamp(f64::INFINITY), 250.0);
        assert_eq!(VIBRATION_RANGE.clamp(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_reading_clamped_keeps_in_range_values() {
        let r = Reading::clamped(OffsetDateTime::UNIX_EPOCH, 55.0, 105.0, 1.2);
        assert_eq!(r.temperature, 55.0);
        assert_eq!(r.pressure, 105.0);
        assert_eq!(r.vibration, 1.2);
        assert!(r.is_within_ranges());
    }

    #[test]
    fn test_reading_get_channel() {
        let r = Reading::clamped(OffsetDateTime::UNIX_EPOCH, 60.0, 100.0, 1.0);
        assert_eq!(r.get(Channel::Temperature), 60.0);
        assert_eq!(r.get(Channel::Pressure), 100.0);
        assert_eq!(r.get(Channel::Vibration), 1.0);
    }

    #[test]
    fn test_status_ordering() {
        assert!(DeviceStatus::Critical > DeviceStatus::Warning);
        assert!(DeviceStatus::Warning > DeviceStatus::Normal);
        assert!(!DeviceStatus::Normal.is_alert());
        assert!(DeviceStatus::Warning.is_alert());
        assert!(DeviceStatus::Critical.is_alert());
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("Normal".parse::<DeviceStatus>(), Ok(DeviceStatus::Normal));
        assert_eq!("warning".parse::<DeviceStatus>(), Ok(DeviceStatus::Warning));
        assert_eq!(" CRITICAL ".parse::<DeviceStatus>(), Ok(DeviceStatus::Critical));
        assert!("red".parse::<DeviceStatus>().is_err());
    }

    #[test]
    fn test_connection_status_from_str() {
        assert_eq!(
            "connecting".parse::<ConnectionStatus>(),
            Ok(ConnectionStatus::Connecting)
        );
        assert!("online".parse::<ConnectionStatus>().is_err());
    }

    #[test]
    fn test_channel_from_str() {
        assert_eq!("temp".parse::<Channel>(), Ok(Channel::Temperature));
        assert_eq!("Vibration".parse::<Channel>(), Ok(Channel::Vibration));
        assert!("humidity".parse::<Channel>().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_reading_serializes_rfc3339_time() {
        let r = Reading::clamped(OffsetDateTime::UNIX_EPOCH, 60.0, 100.0, 1.0);
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"time\":\"1970-01-01T00:00:00Z\""));
        assert!(json.contains("\"temperature\":60.0"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&DeviceStatus::Critical).unwrap(),
            "\"Critical\""
        );
        assert_eq!(
            serde_json::to_string(&ConnectionStatus::Connected).unwrap(),
            "\"Connected\""
        );
    }
}
