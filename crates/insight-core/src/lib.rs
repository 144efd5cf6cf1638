//! Device registry, update cycle and notification pipeline for Factory Insight.
//!
//! This crate turns the plain data model of `insight-types` into a running
//! monitor. It holds the devices, advances them on a fixed interval either by
//! simulation or by polling (mocked) live connections, derives each device's
//! health status and raises notifications when a device leaves the normal
//! tier.
//!
//! # Features
//!
//! - Fixed health thresholds with strict comparisons
//! - Drift-and-noise simulation, seedable for tests
//! - Mocked fieldbus links with per-protocol latency and failure rates
//! - Edge-triggered notifications with a bounded center
//! - Broadcast event stream of every state change
//! - Date-range history explorer with per-channel statistics
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use insight_core::{DeviceRegistry, Mode, Monitor, MockConnector};
//!
//! #[tokio::main]
//! async fn main() {
//!     let connector = Arc::new(MockConnector::instant().with_failure_rate(0.0));
//!     let mut monitor = Monitor::new(DeviceRegistry::factory_floor(), connector);
//!
//!     let report = monitor.tick().await;
//!     assert_eq!(report.updated.len(), 5);
//!
//!     monitor.set_mode(Mode::Live).await;
//!     assert_eq!(monitor.link_count(), 5);
//! }
//! ```

pub mod connection;
pub mod error;
pub mod events;
pub mod explorer;
pub mod mock;
pub mod monitor;
pub mod notifications;
pub mod registry;
pub mod simulation;
pub mod thresholds;

pub use connection::{Connector, LiveConnection};
pub use error::{Error, Result};
pub use events::{
    DEFAULT_EVENT_CAPACITY, EventDispatcher, EventReceiver, EventSender, MonitorEvent,
};
pub use explorer::{ChannelStats, DateRange, HistoryStats};
pub use mock::{LinkProfile, MockConnection, MockConnector};
pub use monitor::{ConnectReport, LinkFailure, Mode, Monitor, TickReport};
pub use notifications::{NotificationCenter, StatusMap, detect_transitions, status_map};
pub use registry::DeviceRegistry;
pub use simulation::{DriftModel, SimulationProfile, Simulator};
pub use thresholds::{Breach, ChannelLimits, ThresholdConfig, Thresholds};

// Re-export the data model for convenience.
pub use insight_types;
