//! In-memory device registry.
//!
//! Devices are kept in insertion order, which is also the order in which they
//! are listed, polled and reported.

use time::OffsetDateTime;

use insight_types::{Device, DeviceSpec, Reading};

use crate::error::{Error, Result};
use crate::thresholds::Thresholds;

/// Ordered collection of monitored devices keyed by id.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The five devices of the demonstration factory floor, stamped now.
    pub fn factory_floor() -> Self {
        Self::factory_floor_at(OffsetDateTime::now_utc())
    }

    /// The demonstration factory floor with an explicit timestamp.
    pub fn factory_floor_at(now: OffsetDateTime) -> Self {
        let thresholds = Thresholds::default();
        let seed = [
            (
                DeviceSpec::new("cnc-001", "CNC Machine Alpha", "Ethernet/IP")
                    .with_param("ipAddress", "192.168.1.10")
                    .with_param("subnetMask", "255.255.255.0")
                    .with_param("defaultGateway", "192.168.1.1"),
                (55.0, 105.0, 1.2),
            ),
            (
                DeviceSpec::new("rbt-002", "Welding Robot Beta", "Profibus")
                    .with_param("stationAddress", 3u32)
                    .with_param("baudRate", 19200u32),
                (65.0, 150.0, 2.1),
            ),
            (
                DeviceSpec::new("pmp-003", "Coolant Pump Gamma", "Modbus RTU")
                    .with_param("slaveAddress", 5u32)
                    .with_param("baudRate", 9600u32)
                    .with_param("parity", "None")
                    .with_param("dataBits", 8u32)
                    .with_param("stopBits", 1u32),
                (78.0, 180.0, 3.5),
            ),
            (
                DeviceSpec::new("asm-004", "Assembly Line Delta", "EtherCAT")
                    .with_param("ipAddress", "192.168.1.12")
                    .with_param("subnetMask", "255.255.255.0")
                    .with_param("defaultGateway", "192.168.1.1"),
                (45.0, 90.0, 0.8),
            ),
            (
                DeviceSpec::new("vlv-005", "Flow Control Valve", "HART")
                    .with_param("deviceTag", "FT-101"),
                (50.0, 115.0, 1.0),
            ),
        ];

        let devices = seed
            .into_iter()
            .map(|(spec, (t, p, v))| {
                let mut device = Device::new(spec, Reading::clamped(now, t, p, v));
                device.status = thresholds.evaluate(&device.current);
                device
            })
            .collect();
        Self { devices }
    }

    /// Add a device. Rejects incomplete records and duplicate ids.
    pub fn add(&mut self, device: Device) -> Result<&Device> {
        device.spec().validate()?;
        if self.contains(&device.id) {
            return Err(Error::DuplicateDevice(device.id));
        }
        self.devices.push(device);
        Ok(&self.devices[self.devices.len() - 1])
    }

    /// Apply edited name, protocol and connection parameters to an existing device.
    pub fn update(&mut self, id: &str, spec: DeviceSpec) -> Result<&Device> {
        let spec = DeviceSpec {
            id: id.to_string(),
            ..spec
        };
        spec.validate()?;
        let device = self.get_mut(id)?;
        device.apply(spec);
        Ok(&*device)
    }

    /// Remove a device and return it.
    pub fn remove(&mut self, id: &str) -> Result<Device> {
        let idx = self
            .position(id)
            .ok_or_else(|| Error::DeviceNotFound(id.to_string()))?;
        Ok(self.devices.remove(idx))
    }

    /// Look up a device.
    pub fn get(&self, id: &str) -> Result<&Device> {
        self.devices
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| Error::DeviceNotFound(id.to_string()))
    }

    /// Look up a device for modification.
    pub fn get_mut(&mut self, id: &str) -> Result<&mut Device> {
        self.devices
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| Error::DeviceNotFound(id.to_string()))
    }

    /// Whether a device with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// All devices in insertion order.
    pub fn list(&self) -> &[Device] {
        &self.devices
    }

    /// Iterate devices mutably in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Device> {
        self.devices.iter_mut()
    }

    /// All device ids in insertion order.
    pub fn ids(&self) -> Vec<String> {
        self.devices.iter().map(|d| d.id.clone()).collect()
    }

    /// Number of devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.devices.iter().position(|d| d.id == id)
    }
}
