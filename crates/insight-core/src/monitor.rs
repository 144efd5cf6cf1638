//! The update cycle.
//!
//! [`Monitor`] owns the device registry and everything the cycle mutates:
//! the mode, the open live connections, the status map of the previous tick
//! and the notification center. One call to [`Monitor::tick`] advances every
//! device by one step:
//!
//! 1. produce a reading per device (simulated, or fetched from its live link)
//! 2. append it to the device history and recompute the status
//! 3. compare statuses with the previous tick and raise notifications
//! 4. replace the previous status map
//!
//! Live failures are isolated per device. A failed fetch marks that device
//! `Error`, disconnects and drops its link, and the rest of the tick carries
//! on.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use insight_types::{AlertLevel, ConnectionStatus, Device, DeviceSpec, Notification, Reading};

use crate::connection::{Connector, LiveConnection};
use crate::error::{Error, Result};
use crate::events::{EventDispatcher, EventReceiver, MonitorEvent};
use crate::notifications::{NotificationCenter, StatusMap, detect_transitions, status_map};
use crate::registry::DeviceRegistry;
use crate::simulation::Simulator;
use crate::thresholds::Thresholds;

/// Where readings come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Readings are synthesized by the drift model.
    #[default]
    Simulation,
    /// Readings are fetched over live connections.
    Live,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Simulation => write!(f, "simulation"),
            Mode::Live => write!(f, "live"),
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulation" | "sim" => Ok(Mode::Simulation),
            "live" => Ok(Mode::Live),
            _ => Err(Error::UnknownMode(s.to_string())),
        }
    }
}

/// A device whose connect or fetch failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkFailure {
    /// Affected device.
    pub device_id: String,
    /// Failure description.
    pub error: String,
}

/// Outcome of one tick.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickReport {
    /// Mode the tick ran in.
    pub mode: Mode,
    /// Devices that recorded a new reading, in registry order.
    pub updated: Vec<String>,
    /// Devices whose live fetch failed.
    pub failures: Vec<LinkFailure>,
    /// Notifications raised by this tick.
    pub notifications: Vec<Notification>,
}

/// Outcome of a batch of connect attempts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectReport {
    /// Devices now holding a live link.
    pub connected: Vec<String>,
    /// Devices whose connect attempt failed.
    pub failed: Vec<LinkFailure>,
}

/// Device registry plus the state of the update cycle.
pub struct Monitor {
    registry: DeviceRegistry,
    mode: Mode,
    connections: HashMap<String, Arc<dyn LiveConnection>>,
    previous: StatusMap,
    notifications: NotificationCenter,
    thresholds: Thresholds,
    simulator: Simulator,
    connector: Arc<dyn Connector>,
    events: EventDispatcher,
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("mode", &self.mode)
            .field("devices", &self.registry.len())
            .field("connections", &self.connections.len())
            .field("notifications", &self.notifications.len())
            .finish()
    }
}

impl Monitor {
    /// Create a monitor in simulation mode.
    ///
    /// The previous-status map starts as a snapshot of the registry, so a
    /// device seeded in an alert tier does not notify on the first tick.
    pub fn new(registry: DeviceRegistry, connector: Arc<dyn Connector>) -> Self {
        let thresholds = Thresholds::default();
        let mut registry = registry;
        for device in registry.iter_mut() {
            device.status = thresholds.evaluate(&device.current);
        }
        let previous = status_map(registry.list());
        Self {
            registry,
            mode: Mode::Simulation,
            connections: HashMap::new(),
            previous,
            notifications: NotificationCenter::new(),
            thresholds,
            simulator: Simulator::new(),
            connector,
            events: EventDispatcher::default(),
        }
    }

    /// Use a specific simulator (for example a seeded one).
    #[must_use]
    pub fn with_simulator(mut self, simulator: Simulator) -> Self {
        self.simulator = simulator;
        self
    }

    /// Use a specific event dispatcher.
    #[must_use]
    pub fn with_events(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    /// Use custom thresholds. Statuses are recomputed immediately.
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        for device in self.registry.iter_mut() {
            device.status = thresholds.evaluate(&device.current);
        }
        self.previous = status_map(self.registry.list());
        self.thresholds = thresholds;
        self
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// All devices in registry order.
    pub fn devices(&self) -> &[Device] {
        self.registry.list()
    }

    /// Look up a device.
    pub fn device(&self, id: &str) -> Result<&Device> {
        self.registry.get(id)
    }

    /// Whether a live link is held for a device.
    pub fn is_linked(&self, id: &str) -> bool {
        self.connections.contains_key(id)
    }

    /// Number of live links held.
    pub fn link_count(&self) -> usize {
        self.connections.len()
    }

    /// The notification center.
    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    /// Mark every notification read.
    pub fn mark_all_read(&mut self) {
        self.notifications.mark_all_read();
    }

    /// Drop every notification.
    pub fn clear_notifications(&mut self) {
        self.notifications.clear();
    }

    /// Raise a test notification for a randomly chosen device.
    ///
    /// Returns `None` when the registry is empty.
    pub fn simulate_notification(&mut self, level: AlertLevel) -> Option<Notification> {
        let devices = self.registry.list();
        let device = &devices[self.simulator.pick(devices.len())?];
        let mut notification = Notification::status_changed(
            &device.id,
            &device.name,
            level,
            OffsetDateTime::now_utc(),
        );
        notification.message = format!(
            "Simulated {} event detected.",
            level.to_string().to_lowercase()
        );

        let stored = self.notifications.extend(vec![notification]).pop()?;
        self.events.send(MonitorEvent::Notification {
            notification: stored.clone(),
        });
        Some(stored)
    }

    /// The thresholds in use.
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// The event dispatcher.
    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// Subscribe to monitor events.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Advance every device by one step.
    pub async fn tick(&mut self) -> TickReport {
        let now = OffsetDateTime::now_utc();
        let mut report = TickReport {
            mode: self.mode,
            ..TickReport::default()
        };

        match self.mode {
            Mode::Simulation => {
                for device in self.registry.iter_mut() {
                    let reading = self.simulator.next_reading_at(&device.current, now);
                    record(&self.thresholds, &self.events, device, reading);
                    report.updated.push(device.id.clone());
                }
            }
            Mode::Live => self.poll_live(&mut report).await,
        }

        let raised = detect_transitions(&self.previous, self.registry.list(), now);
        report.notifications = self.notifications.extend(raised);
        for notification in &report.notifications {
            info!(
                "{} ({}): {}",
                notification.device_name, notification.device_id, notification.message
            );
            self.events.send(MonitorEvent::Notification {
                notification: notification.clone(),
            });
        }
        self.previous = status_map(self.registry.list());

        debug!(
            "Tick ({}): {} updated, {} failed, {} notification(s)",
            report.mode,
            report.updated.len(),
            report.failures.len(),
            report.notifications.len()
        );
        report
    }

    async fn poll_live(&mut self, report: &mut TickReport) {
        let targets: Vec<(String, Arc<dyn LiveConnection>)> = self
            .registry
            .list()
            .iter()
            .filter(|d| d.connection == ConnectionStatus::Connected)
            .filter_map(|d| {
                self.connections
                    .get(&d.id)
                    .map(|conn| (d.id.clone(), Arc::clone(conn)))
            })
            .collect();

        let results = join_all(targets.into_iter().map(|(id, conn)| async move {
            let result = conn.fetch().await;
            (id, conn, result)
        }))
        .await;

        for (id, conn, result) in results {
            match result {
                Ok(reading) => {
                    if let Ok(device) = self.registry.get_mut(&id) {
                        record(&self.thresholds, &self.events, device, reading);
                        report.updated.push(id);
                    }
                }
                Err(e) => {
                    warn!("Failed to fetch data for {}: {}", id, e);
                    conn.disconnect().await;
                    self.connections.remove(&id);
                    self.set_connection(&id, ConnectionStatus::Error, Some(e.to_string()));
                    report.failures.push(LinkFailure {
                        device_id: id,
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    /// Switch modes.
    ///
    /// Entering live mode connects every device that holds no link, all
    /// concurrently; calling it again while live retries failed devices.
    /// Entering simulation mode disconnects every link and resets every
    /// device to `Disconnected`.
    pub async fn set_mode(&mut self, mode: Mode) -> ConnectReport {
        if mode != self.mode {
            info!("Switching to {} mode", mode);
            self.mode = mode;
            self.events.send(MonitorEvent::ModeChanged { mode });
        }

        match mode {
            Mode::Live => self.connect_pending().await,
            Mode::Simulation => {
                self.disconnect_all().await;
                ConnectReport::default()
            }
        }
    }

    async fn connect_pending(&mut self) -> ConnectReport {
        let pending: Vec<Device> = self
            .registry
            .list()
            .iter()
            .filter(|d| !self.connections.contains_key(&d.id))
            .cloned()
            .collect();
        self.connect_devices(pending).await
    }

    async fn connect_devices(&mut self, devices: Vec<Device>) -> ConnectReport {
        for device in &devices {
            self.set_connection(&device.id, ConnectionStatus::Connecting, None);
        }

        let connector = Arc::clone(&self.connector);
        let results = join_all(devices.iter().map(|device| {
            let connector = &connector;
            async move { (device.id.clone(), connector.connect(device).await) }
        }))
        .await;

        let mut report = ConnectReport::default();
        for (id, result) in results {
            match result {
                // A mode switch back to simulation cannot interleave here, so
                // the link is always wanted.
                Ok(conn) => {
                    self.connections.insert(id.clone(), conn);
                    self.set_connection(&id, ConnectionStatus::Connected, None);
                    report.connected.push(id);
                }
                Err(e) => {
                    warn!("Connection to {} failed: {}", id, e);
                    self.set_connection(&id, ConnectionStatus::Error, Some(e.to_string()));
                    report.failed.push(LinkFailure {
                        device_id: id,
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }

    async fn disconnect_all(&mut self) {
        for (_, conn) in self.connections.drain() {
            conn.disconnect().await;
        }
        for id in self.registry.ids() {
            self.set_connection(&id, ConnectionStatus::Disconnected, None);
        }
    }

    fn set_connection(&mut self, id: &str, status: ConnectionStatus, error: Option<String>) {
        if let Ok(device) = self.registry.get_mut(id)
            && device.connection != status
        {
            device.connection = status;
            self.events.send(MonitorEvent::ConnectionChanged {
                device_id: id.to_string(),
                status,
                error,
            });
        }
    }

    /// Add a device with a randomized initial reading.
    ///
    /// In live mode the new device is connected straight away; removing and
    /// re-adding a device is therefore also how a failed link is retried.
    pub async fn add_device(&mut self, spec: DeviceSpec) -> Result<Device> {
        spec.validate()?;
        if self.registry.contains(&spec.id) {
            return Err(Error::DuplicateDevice(spec.id));
        }

        let mut device = Device::new(spec, self.simulator.initial_reading());
        device.status = self.thresholds.evaluate(&device.current);
        let id = device.id.clone();
        info!("Added device {} ({}, {})", device.name, id, device.protocol);
        self.registry.add(device.clone())?;
        self.events.send(MonitorEvent::DeviceAdded {
            device: Box::new(device),
        });

        if self.mode == Mode::Live {
            let added = self.registry.get(&id)?.clone();
            self.connect_devices(vec![added]).await;
        }
        self.registry.get(&id).cloned()
    }

    /// Edit a device's name, protocol and connection parameters.
    pub async fn update_device(&mut self, id: &str, spec: DeviceSpec) -> Result<Device> {
        let device = self.registry.update(id, spec)?.clone();
        info!("Updated device {} ({})", device.name, id);
        Ok(device)
    }

    /// Remove a device, disconnecting its link if it has one.
    pub async fn remove_device(&mut self, id: &str) -> Result<Device> {
        let device = self.registry.remove(id)?;
        if let Some(conn) = self.connections.remove(id) {
            conn.disconnect().await;
        }
        self.previous.remove(id);
        info!("Removed device {} ({})", device.name, id);
        self.events.send(MonitorEvent::DeviceRemoved {
            device_id: id.to_string(),
        });
        Ok(device)
    }

    /// Drive the cycle until `cancel` fires.
    ///
    /// The first tick happens one `interval` after the call. Ticks never
    /// overlap: each one holds the lock until it returns, and timer fires
    /// missed meanwhile are skipped.
    pub async fn run(monitor: Arc<Mutex<Monitor>>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        info!("Update cycle started ({}ms interval)", interval.as_millis());
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    monitor.lock().await.tick().await;
                }
            }
        }
        info!("Update cycle stopped");
    }
}

fn record(thresholds: &Thresholds, events: &EventDispatcher, device: &mut Device, reading: Reading) {
    device.record(reading);
    let status = thresholds.evaluate(&reading);
    if status != device.status {
        events.send(MonitorEvent::StatusChanged {
            device_id: device.id.clone(),
            from: device.status,
            to: status,
        });
        device.status = status;
    }
    events.send(MonitorEvent::Reading {
        device_id: device.id.clone(),
        reading,
    });
}
