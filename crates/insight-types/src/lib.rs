//! Platform-agnostic data model for Factory Insight.
//!
//! This crate provides the shared types used by the monitor (insight-core),
//! the AI gateway (insight-ai) and the HTTP service (insight-service).
//!
//! # Features
//!
//! - Sensor readings with per-channel clamp ranges
//! - Device records with a bounded reading history
//! - Derived health and connection states
//! - Edge-triggered notifications
//! - Catalog of industrial protocol labels and their connection fields
//!
//! # Example
//!
//! ```
//! use insight_types::{Device, DeviceSpec, Reading, HISTORY_CAPACITY};
//!
//! let spec = DeviceSpec::new("cnc-001", "CNC Machine Alpha", "Ethernet/IP")
//!     .with_param("ipAddress", "192.168.1.10");
//! let mut device = Device::new(spec, Reading::now(55.0, 105.0, 1.2));
//!
//! for _ in 0..100 {
//!     device.record(Reading::now(60.0, 110.0, 1.0));
//! }
//! assert_eq!(device.history.len(), HISTORY_CAPACITY);
//! ```

pub mod device;
pub mod error;
pub mod notification;
pub mod protocol;
pub mod types;

pub use device::{ConnectionParams, Device, DeviceSpec, HISTORY_CAPACITY, History, ParamValue};
pub use error::{ValidationError, ValidationResult};
pub use notification::{AlertLevel, NOTIFICATION_CAPACITY, Notification};
pub use protocol::{FieldKind, ProtocolCatalog, ProtocolField, ProtocolInfo};
pub use types::{
    Channel, ChannelRange, ConnectionStatus, DeviceStatus, PRESSURE_RANGE, Reading,
    TEMPERATURE_RANGE, VIBRATION_RANGE,
};

/// Property-based tests for the clamp and history invariants.
#[cfg(test)]
mod proptests {
    use proptest::prelude::*;
    use time::OffsetDateTime;

    use super::*;

    proptest! {
        #[test]
        fn clamped_reading_is_always_in_range(
            t in proptest::num::f64::ANY,
            p in proptest::num::f64::ANY,
            v in proptest::num::f64::ANY,
        ) {
            let reading = Reading::clamped(OffsetDateTime::UNIX_EPOCH, t, p, v);
            prop_assert!(reading.is_within_ranges());
        }

        #[test]
        fn history_never_exceeds_capacity(pushes in 0usize..300) {
            let mut history = History::new();
            for i in 0..pushes {
                history.push(Reading::clamped(OffsetDateTime::UNIX_EPOCH, i as f64, 100.0, 1.0));
            }
            prop_assert!(history.len() <= HISTORY_CAPACITY);
            prop_assert_eq!(history.len(), pushes.min(HISTORY_CAPACITY));
        }
    }
}
