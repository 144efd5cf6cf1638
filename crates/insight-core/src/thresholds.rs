//! Health thresholds and status derivation.
//!
//! A device's status is a pure function of its latest reading. Each channel
//! is checked independently against a critical and a warning limit; the
//! critical tier is checked first and the first matching tier wins.
//!
//! # Example
//!
//! ```
//! use insight_core::Thresholds;
//! use insight_types::{DeviceStatus, Reading};
//!
//! let thresholds = Thresholds::default();
//!
//! assert_eq!(thresholds.evaluate(&Reading::now(90.0, 150.0, 1.0)), DeviceStatus::Critical);
//! assert_eq!(thresholds.evaluate(&Reading::now(80.0, 150.0, 1.0)), DeviceStatus::Warning);
//! assert_eq!(thresholds.evaluate(&Reading::now(60.0, 100.0, 1.0)), DeviceStatus::Normal);
//! ```

use serde::{Deserialize, Serialize};

use insight_types::{Channel, DeviceStatus, Reading};

/// Warning and critical limits for one channel. Limits are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelLimits {
    /// Values strictly above this are at least `Warning`.
    pub warning: f64,
    /// Values strictly above this are `Critical`.
    pub critical: f64,
}

impl ChannelLimits {
    /// Tier of a single value against these limits.
    pub fn evaluate(&self, value: f64) -> DeviceStatus {
        if value > self.critical {
            DeviceStatus::Critical
        } else if value > self.warning {
            DeviceStatus::Warning
        } else {
            DeviceStatus::Normal
        }
    }
}

/// Configuration for the health thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Temperature limits in °C.
    pub temperature: ChannelLimits,
    /// Pressure limits in PSI.
    pub pressure: ChannelLimits,
    /// Vibration limits in G.
    pub vibration: ChannelLimits,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            temperature: ChannelLimits {
                warning: 75.0,
                critical: 85.0,
            },
            pressure: ChannelLimits {
                warning: 180.0,
                critical: 200.0,
            },
            vibration: ChannelLimits {
                warning: 3.5,
                critical: 5.0,
            },
        }
    }
}

impl ThresholdConfig {
    /// Limits for a channel.
    pub fn limits(&self, channel: Channel) -> ChannelLimits {
        match channel {
            Channel::Temperature => self.temperature,
            Channel::Pressure => self.pressure,
            Channel::Vibration => self.vibration,
        }
    }
}

/// A channel whose value crossed a limit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Breach {
    /// The offending channel.
    pub channel: Channel,
    /// The value observed.
    pub value: f64,
    /// The tier it falls into.
    pub level: DeviceStatus,
}

/// Threshold evaluator for sensor readings.
#[derive(Debug, Clone, Default)]
pub struct Thresholds {
    config: ThresholdConfig,
}

impl Thresholds {
    /// Create a new threshold evaluator with the given configuration.
    pub fn new(config: ThresholdConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// Derive the status of a reading.
    ///
    /// `Critical` if any channel is above its critical limit, else `Warning`
    /// if any channel is above its warning limit, else `Normal`.
    pub fn evaluate(&self, reading: &Reading) -> DeviceStatus {
        let critical = Channel::ALL
            .iter()
            .any(|c| reading.get(*c) > self.config.limits(*c).critical);
        if critical {
            return DeviceStatus::Critical;
        }

        let warning = Channel::ALL
            .iter()
            .any(|c| reading.get(*c) > self.config.limits(*c).warning);
        if warning {
            DeviceStatus::Warning
        } else {
            DeviceStatus::Normal
        }
    }

    /// List every channel of a reading that is above a limit.
    pub fn breaches(&self, reading: &Reading) -> Vec<Breach> {
        Channel::ALL
            .iter()
            .filter_map(|channel| {
                let value = reading.get(*channel);
                let level = self.config.limits(*channel).evaluate(value);
                (level != DeviceStatus::Normal).then_some(Breach {
                    channel: *channel,
                    value,
                    level,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(t: f64, p: f64, v: f64) -> Reading {
        Reading::clamped(time::OffsetDateTime::UNIX_EPOCH, t, p, v)
    }

    #[test]
    fn test_documented_examples() {
        let t = Thresholds::default();
        assert_eq!(t.evaluate(&reading(90.0, 150.0, 1.0)), DeviceStatus::Critical);
        assert_eq!(t.evaluate(&reading(80.0, 150.0, 1.0)), DeviceStatus::Warning);
        assert_eq!(t.evaluate(&reading(60.0, 100.0, 1.0)), DeviceStatus::Normal);
    }

    #[test]
    fn test_each_channel_independently_critical() {
        let t = Thresholds::default();
        assert_eq!(t.evaluate(&reading(60.0, 201.0, 1.0)), DeviceStatus::Critical);
        assert_eq!(t.evaluate(&reading(60.0, 100.0, 5.1)), DeviceStatus::Critical);
    }

    #[test]
    fn test_each_channel_independently_warning() {
        let t = Thresholds::default();
        assert_eq!(t.evaluate(&reading(60.0, 181.0, 1.0)), DeviceStatus::Warning);
        assert_eq!(t.evaluate(&reading(60.0, 100.0, 3.6)), DeviceStatus::Warning);
    }

    #[test]
    fn test_critical_wins_over_warning() {
        let t = Thresholds::default();
        // Temperature in warning, vibration in critical.
        assert_eq!(t.evaluate(&reading(80.0, 100.0, 6.0)), DeviceStatus::Critical);
    }

    #[test]
    fn test_boundaries_are_exclusive() {
        let t = Thresholds::default();
        assert_eq!(t.evaluate(&reading(75.0, 180.0, 3.5)), DeviceStatus::Normal);
        assert_eq!(t.evaluate(&reading(85.0, 200.0, 5.0)), DeviceStatus::Warning);
    }

    #[test]
    fn test_seeded_pump_is_warning() {
        // Coolant Pump Gamma starts exactly on the pressure and vibration
        // warning limits but above the temperature one.
        let t = Thresholds::default();
        assert_eq!(t.evaluate(&reading(78.0, 180.0, 3.5)), DeviceStatus::Warning);
    }

    #[test]
    fn test_breaches() {
        let t = Thresholds::default();
        let breaches = t.breaches(&reading(90.0, 185.0, 1.0));
        assert_eq!(breaches.len(), 2);
        assert_eq!(breaches[0].channel, Channel::Temperature);
        assert_eq!(breaches[0].level, DeviceStatus::Critical);
        assert_eq!(breaches[1].channel, Channel::Pressure);
        assert_eq!(breaches[1].level, DeviceStatus::Warning);

        assert!(t.breaches(&reading(60.0, 100.0, 1.0)).is_empty());
    }

    #[test]
    fn test_custom_config() {
        let mut config = ThresholdConfig::default();
        config.temperature.warning = 50.0;
        let t = Thresholds::new(config);
        assert_eq!(t.evaluate(&reading(60.0, 100.0, 1.0)), DeviceStatus::Warning);
        assert_eq!(t.config().temperature.warning, 50.0);
    }
}
