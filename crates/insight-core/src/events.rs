//! Monitor event stream.
//!
//! Every observable change made by the [`Monitor`](crate::Monitor) is
//! published as a [`MonitorEvent`] on a broadcast channel. Sending never
//! blocks; a receiver that falls behind loses the oldest events.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use insight_types::{ConnectionStatus, Device, DeviceStatus, Notification, Reading};

use crate::monitor::Mode;

/// Events emitted by the monitor.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum MonitorEvent {
    /// A device recorded a new reading.
    Reading { device_id: String, reading: Reading },
    /// A device's derived status changed.
    StatusChanged {
        device_id: String,
        from: DeviceStatus,
        to: DeviceStatus,
    },
    /// A device's connection state changed.
    ConnectionChanged {
        device_id: String,
        status: ConnectionStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// A notification was raised.
    Notification { notification: Notification },
    /// The monitor switched modes.
    ModeChanged { mode: Mode },
    /// A device was added.
    DeviceAdded { device: Box<Device> },
    /// A device was removed.
    DeviceRemoved { device_id: String },
}

impl MonitorEvent {
    /// Device the event concerns, if any.
    pub fn device_id(&self) -> Option<&str> {
        match self {
            MonitorEvent::Reading { device_id, .. }
            | MonitorEvent::StatusChanged { device_id, .. }
            | MonitorEvent::ConnectionChanged { device_id, .. }
            | MonitorEvent::DeviceRemoved { device_id } => Some(device_id),
            MonitorEvent::Notification { notification } => Some(&notification.device_id),
            MonitorEvent::DeviceAdded { device } => Some(&device.id),
            MonitorEvent::ModeChanged { .. } => None,
        }
    }
}

/// Sender for monitor events.
pub type EventSender = broadcast::Sender<MonitorEvent>;

/// Receiver for monitor events.
pub type EventReceiver = broadcast::Receiver<MonitorEvent>;

/// Default channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Fan-out point for monitor events.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventDispatcher {
    /// Create a dispatcher buffering up to `capacity` events per receiver.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: MonitorEvent) {
        // No receivers is fine.
        let _ = self.sender.send(event);
    }

    /// Number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Underlying sender.
    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = MonitorEvent::StatusChanged {
            device_id: "pmp-003".into(),
            from: DeviceStatus::Normal,
            to: DeviceStatus::Critical,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "status_changed");
        assert_eq!(json["to"], "Critical");

        let event = MonitorEvent::ConnectionChanged {
            device_id: "a".into(),
            status: ConnectionStatus::Connected,
            error: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "connection_changed");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_mode_event_serialization() {
        let json = serde_json::to_value(MonitorEvent::ModeChanged { mode: Mode::Live }).unwrap();
        assert_eq!(json["type"], "mode_changed");
        assert_eq!(json["mode"], "live");
    }

    #[tokio::test]
    async fn test_dispatcher_fan_out() {
        let dispatcher = EventDispatcher::new(8);
        let mut a = dispatcher.subscribe();
        let mut b = dispatcher.subscribe();
        assert_eq!(dispatcher.receiver_count(), 2);

        dispatcher.send(MonitorEvent::DeviceRemoved {
            device_id: "x".into(),
        });
        assert_eq!(a.recv().await.unwrap().device_id(), Some("x"));
        assert_eq!(b.recv().await.unwrap().device_id(), Some("x"));
    }

    #[test]
    fn test_send_without_receivers() {
        let dispatcher = EventDispatcher::default();
        dispatcher.send(MonitorEvent::ModeChanged {
            mode: Mode::Simulation,
        });
    }
}
