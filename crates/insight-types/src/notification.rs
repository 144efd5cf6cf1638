//! Status-transition notifications.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::DeviceStatus;

/// Maximum number of notifications retained.
pub const NOTIFICATION_CAPACITY: usize = 50;

/// Severity of an alert. Only entries into a worse tier are alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AlertLevel {
    /// Device entered the warning tier.
    Warning,
    /// Device entered the critical tier.
    Critical,
}

impl AlertLevel {
    /// Map a device status to an alert level; `Normal` is not an alert.
    #[must_use]
    pub fn from_status(status: DeviceStatus) -> Option<Self> {
        match status {
            DeviceStatus::Normal => None,
            DeviceStatus::Warning => Some(AlertLevel::Warning),
            DeviceStatus::Critical => Some(AlertLevel::Critical),
        }
    }
}

impl From<AlertLevel> for DeviceStatus {
    fn from(level: AlertLevel) -> Self {
        match level {
            AlertLevel::Warning => DeviceStatus::Warning,
            AlertLevel::Critical => DeviceStatus::Critical,
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        DeviceStatus::from(*self).fmt(f)
    }
}

/// An edge-triggered alert raised when a device leaves the normal tier.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Notification {
    /// Monotonic identifier assigned by the notification center.
    pub id: u64,
    /// Device that changed status.
    pub device_id: String,
    /// Device display name at the time of the alert.
    pub device_name: String,
    /// Human-readable message.
    pub message: String,
    /// When the transition was observed.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
    /// Tier that was entered.
    pub level: AlertLevel,
    /// Whether the operator has seen it.
    pub is_read: bool,
}

impl Notification {
    /// Build an unread notification for a device entering `level`.
    ///
    /// The id is left at zero; the notification center assigns it.
    pub fn status_changed(
        device_id: impl Into<String>,
        device_name: impl Into<String>,
        level: AlertLevel,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            id: 0,
            device_id: device_id.into(),
            device_name: device_name.into(),
            message: format!("Status changed to {level}."),
            timestamp,
            level,
            is_read: false,
        }
    }
}
