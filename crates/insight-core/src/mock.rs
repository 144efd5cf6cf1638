//! Mocked industrial links.
//!
//! No real fieldbus is spoken. [`MockConnector`] picks a [`LinkProfile`] from
//! the device's protocol label, waits a randomized connect latency and fails
//! with the profile's probability. [`MockConnection`] then serves a slow
//! random walk around the device's last reading.
//!
//! # Features
//!
//! - **Failure injection**: fail the next N fetches, fail every fetch, or
//!   refuse specific devices at connect time
//! - **Latency scaling**: multiply every simulated delay; `0.0` disables them
//! - **Failure override**: replace the per-profile connect failure rates

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::RwLock;
use tracing::{debug, info};

use insight_types::{Device, Reading};

use crate::connection::{Connector, LiveConnection};
use crate::error::{Error, Result};

/// Timing and reliability class of a protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkProfile {
    /// Ethernet/IP, EtherCAT and Modbus TCP/IP.
    Ethernet,
    /// Modbus RTU and Profibus.
    Serial,
    /// HART and any user-defined protocol.
    Generic,
}

impl LinkProfile {
    /// Classify a protocol label.
    pub fn for_protocol(protocol: &str) -> Self {
        match protocol {
            "Ethernet/IP" | "EtherCAT" | "Modbus TCP/IP" => LinkProfile::Ethernet,
            "Modbus RTU" | "Profibus" => LinkProfile::Serial,
            _ => LinkProfile::Generic,
        }
    }

    /// Connect latency bounds in milliseconds.
    pub fn connect_latency_ms(&self) -> (u64, u64) {
        match self {
            LinkProfile::Ethernet => (500, 1500),
            LinkProfile::Serial => (300, 800),
            LinkProfile::Generic => (400, 1200),
        }
    }

    /// Probability that a connect attempt fails.
    pub fn failure_rate(&self) -> f64 {
        match self {
            LinkProfile::Ethernet => 0.10,
            LinkProfile::Serial => 0.15,
            LinkProfile::Generic => 0.10,
        }
    }

    /// Failure message for a device name.
    pub fn failure_message(&self, device_name: &str) -> String {
        match self {
            LinkProfile::Ethernet => format!("Connection timed out for {device_name}"),
            LinkProfile::Serial => format!("Serial port could not be opened for {device_name}"),
            LinkProfile::Generic => format!("Generic connection failed for {device_name}"),
        }
    }

    fn describe(&self, device: &Device) -> String {
        let param = |key: &str| {
            device
                .connection_params
                .get(key)
                .map(ToString::to_string)
                .unwrap_or_else(|| "?".to_string())
        };
        match self {
            LinkProfile::Ethernet => format!("{} at {}", device.protocol, param("ipAddress")),
            LinkProfile::Serial if device.protocol == "Profibus" => {
                format!("Profibus station {}", param("stationAddress"))
            }
            LinkProfile::Serial => format!("Modbus RTU slave {}", param("slaveAddress")),
            LinkProfile::Generic => format!("{} (generic)", device.protocol),
        }
    }
}

/// Fetch latency bounds in milliseconds.
const FETCH_LATENCY_MS: (u64, u64) = (100, 300);

/// Maximum random-walk step per channel: ±0.25 °C, ±1 PSI, ±0.05 G.
const WALK_SPAN: (f64, f64, f64) = (0.5, 2.0, 0.1);

fn scaled_delay(bounds: (u64, u64), scale: f64) -> Option<Duration> {
    if scale <= 0.0 {
        return None;
    }
    let ms = rand::rng().random_range(bounds.0..=bounds.1) as f64 * scale;
    Some(Duration::from_secs_f64(ms / 1000.0))
}

/// A mocked live link serving a random walk.
pub struct MockConnection {
    device_id: String,
    device_name: String,
    protocol: String,
    last: RwLock<Reading>,
    connected: AtomicBool,
    should_fail: AtomicBool,
    remaining_failures: AtomicU32,
    fetch_count: AtomicU32,
    latency_scale: f64,
}

impl std::fmt::Debug for MockConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConnection")
            .field("device_id", &self.device_id)
            .field("protocol", &self.protocol)
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .finish()
    }
}

impl MockConnection {
    /// Open a link seeded with the device's current reading.
    pub fn new(device: &Device, latency_scale: f64) -> Self {
        Self {
            device_id: device.id.clone(),
            device_name: device.name.clone(),
            protocol: device.protocol.clone(),
            last: RwLock::new(device.current),
            connected: AtomicBool::new(true),
            should_fail: AtomicBool::new(false),
            remaining_failures: AtomicU32::new(0),
            fetch_count: AtomicU32::new(0),
            latency_scale,
        }
    }

    /// Make every fetch fail (or succeed again).
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Fail the next `count` fetches, then succeed.
    pub fn fail_next(&self, count: u32) {
        self.remaining_failures.store(count, Ordering::Relaxed);
    }

    /// Number of successful fetches served.
    pub fn fetch_count(&self) -> u32 {
        self.fetch_count.load(Ordering::Relaxed)
    }

    /// Whether [`LiveConnection::disconnect`] has not been called yet.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn check_failure(&self) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected(self.device_id.clone()));
        }
        let injected = self
            .remaining_failures
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();
        if injected || self.should_fail.load(Ordering::Relaxed) {
            return Err(Error::fetch_failed(
                &self.device_id,
                format!("Lost link to {}", self.device_name),
            ));
        }
        Ok(())
    }

    fn walk(last: &Reading) -> Reading {
        let mut rng = rand::rng();
        let mut delta = |span: f64| (rng.random::<f64>() - 0.5) * span;
        let temperature = last.temperature + delta(WALK_SPAN.0);
        let pressure = last.pressure + delta(WALK_SPAN.1);
        let vibration = last.vibration + delta(WALK_SPAN.2);
        Reading::now(temperature, pressure, vibration)
    }
}

#[async_trait]
impl LiveConnection for MockConnection {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn protocol(&self) -> &str {
        &self.protocol
    }

    async fn fetch(&self) -> Result<Reading> {
        if let Some(delay) = scaled_delay(FETCH_LATENCY_MS, self.latency_scale) {
            tokio::time::sleep(delay).await;
        }
        self.check_failure()?;

        let mut last = self.last.write().await;
        *last = Self::walk(&last);
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        Ok(*last)
    }

    async fn disconnect(&self) {
        if self.connected.swap(false, Ordering::Relaxed) {
            info!("Disconnected {} from {}", self.protocol, self.device_name);
        }
    }
}

/// Opens [`MockConnection`]s with per-protocol latency and failure rates.
///
/// ```
/// use insight_core::{Connector, MockConnector};
/// use insight_types::{Device, DeviceSpec, Reading};
///
/// #[tokio::main]
/// async fn main() {
///     let connector = MockConnector::instant().with_failure_rate(0.0);
///     let device = Device::new(
///         DeviceSpec::new("vlv-005", "Flow Control Valve", "HART"),
///         Reading::now(50.0, 115.0, 1.0),
///     );
///     let link = connector.connect(&device).await.unwrap();
///     assert!(link.fetch().await.unwrap().is_within_ranges());
/// }
/// ```
pub struct MockConnector {
    latency_scale: f64,
    failure_rate: Option<f64>,
    refused: RwLock<HashSet<String>>,
    opened: RwLock<HashMap<String, Arc<MockConnection>>>,
}

impl std::fmt::Debug for MockConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConnector")
            .field("latency_scale", &self.latency_scale)
            .field("failure_rate", &self.failure_rate)
            .finish()
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    /// Connector with realistic latencies and the per-profile failure rates.
    pub fn new() -> Self {
        Self {
            latency_scale: 1.0,
            failure_rate: None,
            refused: RwLock::new(HashSet::new()),
            opened: RwLock::new(HashMap::new()),
        }
    }

    /// Connector with every delay disabled.
    pub fn instant() -> Self {
        Self::new().with_latency_scale(0.0)
    }

    /// Multiply every simulated delay by `scale`; `0.0` disables delays.
    #[must_use]
    pub fn with_latency_scale(mut self, scale: f64) -> Self {
        self.latency_scale = scale.max(0.0);
        self
    }

    /// Use one connect failure probability for every profile.
    #[must_use]
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = Some(rate.clamp(0.0, 1.0));
        self
    }

    /// Current latency scale.
    pub fn latency_scale(&self) -> f64 {
        self.latency_scale
    }

    /// Refuse every connect attempt for a device id.
    pub async fn refuse(&self, device_id: &str) {
        self.refused.write().await.insert(device_id.to_string());
    }

    /// Accept connect attempts for a previously refused device id.
    pub async fn accept(&self, device_id: &str) {
        self.refused.write().await.remove(device_id);
    }

    /// The most recent link opened for a device, for failure injection.
    pub async fn connection(&self, device_id: &str) -> Option<Arc<MockConnection>> {
        self.opened.read().await.get(device_id).cloned()
    }

    fn roll_failure(&self, profile: LinkProfile) -> bool {
        let rate = self.failure_rate.unwrap_or_else(|| profile.failure_rate());
        rand::rng().random::<f64>() < rate
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, device: &Device) -> Result<Arc<dyn LiveConnection>> {
        let profile = LinkProfile::for_protocol(&device.protocol);
        debug!(
            "Opening {} link to {}",
            profile.describe(device),
            device.name
        );

        if let Some(delay) = scaled_delay(profile.connect_latency_ms(), self.latency_scale) {
            tokio::time::sleep(delay).await;
        }

        let refused = self.refused.read().await.contains(&device.id);
        if refused || self.roll_failure(profile) {
            return Err(Error::connection_failed(
                &device.id,
                profile.failure_message(&device.name),
            ));
        }

        let connection = Arc::new(MockConnection::new(device, self.latency_scale));
        self.opened
            .write()
            .await
            .insert(device.id.clone(), Arc::clone(&connection));
        info!("{} connection successful for {}", device.protocol, device.name);
        Ok(connection)
    }
}
