//! Error types for insight-core.
//!
//! Nothing in the monitor is fatal. Connection and fetch failures are
//! reported here and then folded into the device's connection state
//! ([`ConnectionStatus::Error`](insight_types::ConnectionStatus::Error)) by
//! the update cycle; the other variants reject a single registry operation.
//!
//! No error is retried automatically. A device that failed to connect stays
//! in the error state until live mode is re-entered or the device is re-added.

use thiserror::Error;

use insight_types::ValidationError;

/// Errors that can occur in the device registry and update cycle.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum Error {
    /// Opening a live connection failed.
    #[error("Connection failed for {device_id}: {reason}")]
    ConnectionFailed {
        /// The device that failed to connect.
        device_id: String,
        /// Why the connection could not be established.
        reason: String,
    },

    /// Fetching a reading over an open connection failed.
    #[error("Fetch failed for {device_id}: {reason}")]
    FetchFailed {
        /// The device being polled.
        device_id: String,
        /// Why the fetch failed.
        reason: String,
    },

    /// The connection handle was already torn down.
    #[error("Device {0} is not connected")]
    NotConnected(String),

    /// No device with the given id exists.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// A device with the same id already exists.
    #[error("Device with ID '{0}' already exists")]
    DuplicateDevice(String),

    /// The submitted device record is incomplete.
    #[error("Invalid device: {0}")]
    InvalidDevice(#[from] ValidationError),

    /// A protocol catalog entry was rejected.
    #[error("Invalid protocol: {0}")]
    InvalidProtocol(String),

    /// A mode name did not parse.
    #[error("Unknown mode '{0}' (expected 'simulation' or 'live')")]
    UnknownMode(String),
}

impl Error {
    /// Create a connection failure.
    pub fn connection_failed(device_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            device_id: device_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a fetch failure.
    pub fn fetch_failed(device_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FetchFailed {
            device_id: device_id.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error concerns a live link rather than registry input.
    pub fn is_link_failure(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::FetchFailed { .. } | Self::NotConnected(_)
        )
    }
}

/// Result type alias using insight-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::connection_failed("cnc-001", "Connection timed out for CNC Machine Alpha");
        assert_eq!(
            err.to_string(),
            "Connection failed for cnc-001: Connection timed out for CNC Machine Alpha"
        );

        let err = Error::DuplicateDevice("cnc-001".into());
        assert_eq!(err.to_string(), "Device with ID 'cnc-001' already exists");

        let err = Error::DeviceNotFound("x".into());
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_validation_error_conversion() {
        let err: Error = ValidationError::EmptyField("name").into();
        assert!(matches!(err, Error::InvalidDevice(_)));
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_link_failure_classification() {
        assert!(Error::fetch_failed("a", "b").is_link_failure());
        assert!(Error::NotConnected("a".into()).is_link_failure());
        assert!(!Error::DuplicateDevice("a".into()).is_link_failure());
    }
}
