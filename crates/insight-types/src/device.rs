//! Device records and their bounded reading history.

use core::fmt;
use std::collections::{BTreeMap, VecDeque};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};
use crate::types::{ConnectionStatus, DeviceStatus, Reading};

/// Maximum number of readings kept per device.
pub const HISTORY_CAPACITY: usize = 50;

/// A single protocol-specific connection parameter.
///
/// Parameters are an opaque bag as far as the monitor is concerned; only the
/// mock connection layer reads a few of them for log messages.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ParamValue {
    /// Numeric parameter such as a baud rate or slave address.
    Number(f64),
    /// Free-text parameter such as an IP address or device tag.
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            ParamValue::Number(n) => write!(f, "{n}"),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Number(f64::from(value))
    }
}

/// Protocol-specific connection parameters, keyed by field name.
pub type ConnectionParams = BTreeMap<String, ParamValue>;

/// Ordered reading history capped at [`HISTORY_CAPACITY`] entries.
///
/// The most recent reading is at the back; pushing onto a full history drops
/// the oldest reading.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "Vec<Reading>", into = "Vec<Reading>"))]
pub struct History {
    readings: VecDeque<Reading>,
}

impl History {
    /// Create an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self {
            readings: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// Create a history holding a single reading.
    #[must_use]
    pub fn starting_with(reading: Reading) -> Self {
        let mut history = Self::new();
        history.push(reading);
        history
    }

    /// Append a reading, dropping the oldest entries beyond the cap.
    pub fn push(&mut self, reading: Reading) {
        self.readings.push_back(reading);
        while self.readings.len() > HISTORY_CAPACITY {
            self.readings.pop_front();
        }
    }

    /// Number of readings held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Most recent reading.
    #[must_use]
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Reading> + ExactSizeIterator {
        self.readings.iter()
    }

    /// Copy the readings out, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Reading> {
        self.readings.iter().copied().collect()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<Reading>> for History {
    fn from(readings: Vec<Reading>) -> Self {
        let mut history = Self::new();
        for reading in readings {
            history.push(reading);
        }
        history
    }
}

impl From<History> for Vec<Reading> {
    fn from(history: History) -> Self {
        history.readings.into()
    }
}

/// The editable identity of a device, as submitted by device management forms.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceSpec {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Protocol label (free text, not an implemented protocol).
    pub protocol: String,
    /// Protocol-specific connection parameters.
    #[cfg_attr(feature = "serde", serde(default))]
    pub connection_params: ConnectionParams,
}

impl DeviceSpec {
    /// Create a new spec with no connection parameters.
    pub fn new(id: impl Into<String>, name: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            protocol: protocol.into(),
            connection_params: ConnectionParams::new(),
        }
    }

    /// Add a connection parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.connection_params.insert(key.into(), value.into());
        self
    }

    /// Check that id, name and protocol are all present.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyField("id"));
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        if self.protocol.trim().is_empty() {
            return Err(ValidationError::EmptyField("protocol"));
        }
        Ok(())
    }
}

/// A monitored piece of factory equipment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Device {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Protocol label.
    pub protocol: String,
    /// Protocol-specific connection parameters.
    #[cfg_attr(feature = "serde", serde(default))]
    pub connection_params: ConnectionParams,
    /// Derived health tier of the latest reading.
    pub status: DeviceStatus,
    /// Live connection lifecycle state.
    pub connection: ConnectionStatus,
    /// Latest reading.
    pub current: Reading,
    /// Bounded reading history, oldest first.
    pub history: History,
}

impl Device {
    /// Create a device from a spec and its first reading.
    ///
    /// The device starts `Normal` and `Disconnected`; callers that know the
    /// thresholds should recompute the status.
    #[must_use]
    pub fn new(spec: DeviceSpec, initial: Reading) -> Self {
        Self {
            id: spec.id,
            name: spec.name,
            protocol: spec.protocol,
            connection_params: spec.connection_params,
            status: DeviceStatus::Normal,
            connection: ConnectionStatus::Disconnected,
            current: initial,
            history: History::starting_with(initial),
        }
    }

    /// Record a new reading: it becomes current and is appended to history.
    pub fn record(&mut self, reading: Reading) {
        self.current = reading;
        self.history.push(reading);
    }

    /// Apply edited identity fields. The id never changes.
    pub fn apply(&mut self, spec: DeviceSpec) {
        self.name = spec.name;
        self.protocol = spec.protocol;
        self.connection_params = spec.connection_params;
    }

    /// The editable identity of this device.
    #[must_use]
    pub fn spec(&self) -> DeviceSpec {
        DeviceSpec {
            id: self.id.clone(),
            name: self.name.clone(),
            protocol: self.protocol.clone(),
            connection_params: self.connection_params.clone(),
        }
    }
}
