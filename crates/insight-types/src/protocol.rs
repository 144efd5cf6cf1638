//! Catalog of industrial protocol labels and their connection form fields.
//!
//! Protocols are classification labels only; nothing here speaks the wire
//! protocol. The field descriptors tell a client which connection parameters
//! to collect for a device using that protocol.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

/// Input kind of a connection parameter field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FieldKind {
    /// Free text.
    Text,
    /// Numeric value.
    Number,
    /// One of a fixed set of options.
    Select,
}

/// Descriptor of one connection parameter for a protocol.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProtocolField {
    /// Parameter key stored in the device's connection params.
    pub name: String,
    /// Human-readable label.
    pub label: String,
    /// Input kind.
    pub kind: FieldKind,
    /// Example value shown to the operator.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub placeholder: Option<String>,
    /// Allowed values for [`FieldKind::Select`].
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Vec::is_empty"))]
    pub options: Vec<String>,
}

impl ProtocolField {
    fn text(name: &str, label: &str, placeholder: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: FieldKind::Text,
            placeholder: Some(placeholder.to_string()),
            options: Vec::new(),
        }
    }

    fn number(name: &str, label: &str, placeholder: &str) -> Self {
        Self {
            kind: FieldKind::Number,
            ..Self::text(name, label, placeholder)
        }
    }

    fn select(name: &str, label: &str, options: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: FieldKind::Select,
            placeholder: None,
            options: options.iter().map(|o| (*o).to_string()).collect(),
        }
    }
}

/// A protocol label with its description and form fields.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProtocolInfo {
    /// Protocol name, used as the device's protocol label.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Connection parameter fields (empty for user-added protocols).
    #[cfg_attr(feature = "serde", serde(default))]
    pub fields: Vec<ProtocolField>,
}

/// Ordered collection of known protocols.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ProtocolCatalog {
    protocols: Vec<ProtocolInfo>,
}

impl ProtocolCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            protocols: Vec::new(),
        }
    }

    /// Look up a protocol by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ProtocolInfo> {
        self.protocols.iter().find(|p| p.name == name)
    }

    /// Connection fields for a protocol (empty when unknown).
    #[must_use]
    pub fn fields(&self, name: &str) -> &[ProtocolField] {
        self.get(name).map(|p| p.fields.as_slice()).unwrap_or(&[])
    }

    /// Iterate protocols in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &ProtocolInfo> {
        self.protocols.iter()
    }

    /// Protocol names in catalog order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.protocols.iter().map(|p| p.name.as_str()).collect()
    }

    /// Number of protocols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }

    /// Add or replace a protocol description.
    ///
    /// Name and description are trimmed and must be non-blank. Replacing an
    /// existing protocol keeps its form fields.
    pub fn add(&mut self, name: &str, description: &str) -> ValidationResult<&ProtocolInfo> {
        let name = name.trim();
        let description = description.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        if description.is_empty() {
            return Err(ValidationError::EmptyField("description"));
        }

        let idx = match self.protocols.iter().position(|p| p.name == name) {
            Some(idx) => {
                self.protocols[idx].description = description.to_string();
                idx
            }
            None => {
                self.protocols.push(ProtocolInfo {
                    name: name.to_string(),
                    description: description.to_string(),
                    fields: Vec::new(),
                });
                self.protocols.len() - 1
            }
        };
        Ok(&self.protocols[idx])
    }
}

fn ip_fields(example_ip: &str) -> Vec<ProtocolField> {
    vec![
        ProtocolField::text("ipAddress", "IP Address", &format!("e.g., {example_ip}")),
        ProtocolField::text("subnetMask", "Subnet Mask", "e.g., 255.255.255.0"),
        ProtocolField::text("defaultGateway", "Default Gateway", "e.g., 192.168.1.1"),
    ]
}

impl Default for ProtocolCatalog {
    /// The six fieldbus and industrial Ethernet protocols known out of the box.
    fn default() -> Self {
        let protocols = vec![
            ProtocolInfo {
                name: "Modbus RTU".into(),
                description: "A serial communication protocol (RS-485, RS-232) for connecting \
                    industrial electronic devices. It's known for its simplicity and reliability."
                    .into(),
                fields: vec![
                    ProtocolField::number("slaveAddress", "Slave Address", "1-247"),
                    ProtocolField::number("baudRate", "Baud Rate", "e.g., 9600"),
                    ProtocolField::select("parity", "Parity", &["None", "Even", "Odd"]),
                    ProtocolField::number("dataBits", "Data Bits", "e.g., 8"),
                    ProtocolField::number("stopBits", "Stop Bits", "e.g., 1"),
                ],
            },
            ProtocolInfo {
                name: "Modbus TCP/IP".into(),
                description: "An adaptation of Modbus for Ethernet networks. It encapsulates \
                    Modbus RTU request/response data packets in a TCP/IP wrapper."
                    .into(),
                fields: ip_fields("192.168.1.10"),
            },
            ProtocolInfo {
                name: "Profibus".into(),
                description: "A standard for fieldbus communication in automation technology. \
                    It's suited for complex communication tasks and time-critical applications."
                    .into(),
                fields: vec![
                    ProtocolField::number("stationAddress", "Station Address", "1-126"),
                    ProtocolField::number("baudRate", "Baud Rate", "e.g., 19200"),
                ],
            },
            ProtocolInfo {
                name: "Ethernet/IP".into(),
                description: "An industrial network protocol that adapts the Common Industrial \
                    Protocol (CIP) to standard Ethernet. It offers a wide range of network services."
                    .into(),
                fields: ip_fields("192.168.1.11"),
            },
            ProtocolInfo {
                name: "EtherCAT".into(),
                description: "Ethernet for Control Automation Technology is an Ethernet-based \
                    fieldbus system. It's known for high performance and flexible topology."
                    .into(),
                fields: ip_fields("192.168.1.12"),
            },
            ProtocolInfo {
                name: "HART".into(),
                description: "Highway Addressable Remote Transducer Protocol is a hybrid \
                    analog+digital protocol widely used in process and instrumentation systems."
                    .into(),
                fields: vec![ProtocolField::text("deviceTag", "Device Tag", "e.g., FT-101")],
            },
        ];
        Self { protocols }
    }
}
