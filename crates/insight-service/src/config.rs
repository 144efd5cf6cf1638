//! Server configuration.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use insight_core::Mode;
use insight_types::{ConnectionParams, DeviceSpec};

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// Update cycle settings.
    pub cycle: CycleConfig,
    /// Simulation and mock link settings.
    pub simulation: SimulationConfig,
    /// AI gateway settings.
    pub ai: AiConfig,
    /// Devices to seed the registry with; empty means the factory floor defaults.
    pub devices: Vec<DeviceConfig>,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration, collecting every error.
    ///
    /// # Example
    ///
    /// ```
    /// use insight_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.cycle.validate());
        errors.extend(self.simulation.validate());

        let mut seen_ids = HashSet::new();
        for (i, device) in self.devices.iter().enumerate() {
            let prefix = format!("devices[{}]", i);
            errors.extend(device.validate(&prefix));
            if !seen_ids.insert(device.id.as_str()) {
                errors.push(ValidationError {
                    field: format!("{}.id", prefix),
                    message: format!("duplicate device id '{}'", device.id),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind: String,
    /// Capacity of the monitor event channel; lagging WebSocket clients drop
    /// the oldest events.
    pub broadcast_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            broadcast_buffer: insight_core::DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: "bind address cannot be empty".to_string(),
            });
        } else {
            match self.bind.rsplit_once(':') {
                None => errors.push(ValidationError {
                    field: "server.bind".to_string(),
                    message: format!(
                        "invalid bind address '{}': expected format 'host:port'",
                        self.bind
                    ),
                }),
                Some((_, port)) => match port.parse::<u16>() {
                    Ok(0) => errors.push(ValidationError {
                        field: "server.bind".to_string(),
                        message: "port cannot be 0".to_string(),
                    }),
                    Err(_) => errors.push(ValidationError {
                        field: "server.bind".to_string(),
                        message: format!("invalid port '{}': must be a number 1-65535", port),
                    }),
                    Ok(_) => {}
                },
            }
        }

        if self.broadcast_buffer == 0 {
            errors.push(ValidationError {
                field: "server.broadcast_buffer".to_string(),
                message: "broadcast buffer must be at least 1".to_string(),
            });
        }

        errors
    }
}

/// Minimum cycle interval in milliseconds.
pub const MIN_INTERVAL_MS: u64 = 100;
/// Maximum cycle interval in milliseconds (1 hour).
pub const MAX_INTERVAL_MS: u64 = 3_600_000;
/// Cycle interval of the original dashboard.
pub const DEFAULT_INTERVAL_MS: u64 = 2000;

/// Update cycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Time between ticks.
    pub interval_ms: u64,
    /// Mode at startup.
    pub mode: Mode,
    /// Start the cycle together with the server.
    pub autostart: bool,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            mode: Mode::Simulation,
            autostart: true,
        }
    }
}

impl CycleConfig {
    /// Validate cycle configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.interval_ms < MIN_INTERVAL_MS {
            errors.push(ValidationError {
                field: "cycle.interval_ms".to_string(),
                message: format!(
                    "interval {}ms is too short (minimum {}ms)",
                    self.interval_ms, MIN_INTERVAL_MS
                ),
            });
        } else if self.interval_ms > MAX_INTERVAL_MS {
            errors.push(ValidationError {
                field: "cycle.interval_ms".to_string(),
                message: format!(
                    "interval {}ms is too long (maximum {}ms / 1 hour)",
                    self.interval_ms, MAX_INTERVAL_MS
                ),
            });
        }
        errors
    }

    /// Interval as a [`Duration`](std::time::Duration).
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.interval_ms)
    }
}

/// Simulation and mock link configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Multiplier for mock connect and fetch latencies; 0 disables delays.
    pub latency_scale: f64,
    /// Seed for the drift model; random when absent.
    pub seed: Option<u64>,
    /// Connect failure probability for every protocol, replacing the
    /// per-protocol defaults.
    pub failure_rate: Option<f64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            latency_scale: 1.0,
            seed: None,
            failure_rate: None,
        }
    }
}

impl SimulationConfig {
    /// Validate simulation configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if !self.latency_scale.is_finite() || self.latency_scale < 0.0 {
            errors.push(ValidationError {
                field: "simulation.latency_scale".to_string(),
                message: format!(
                    "latency scale {} must be a non-negative number",
                    self.latency_scale
                ),
            });
        }
        if let Some(rate) = self.failure_rate
            && !(0.0..=1.0).contains(&rate)
        {
            errors.push(ValidationError {
                field: "simulation.failure_rate".to_string(),
                message: format!("failure rate {} must be between 0 and 1", rate),
            });
        }
        errors
    }
}

/// AI gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// AI settings file; the per-user default when absent.
    pub settings_path: Option<PathBuf>,
}

impl AiConfig {
    /// Resolved settings file path.
    pub fn settings_path(&self) -> PathBuf {
        self.settings_path
            .clone()
            .unwrap_or_else(insight_ai::SettingsStore::default_path)
    }
}

/// A device to seed the registry with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Protocol label.
    pub protocol: String,
    /// Connection parameters.
    #[serde(default)]
    pub params: ConnectionParams,
}

impl DeviceConfig {
    /// Validate device configuration.
    pub fn validate(&self, prefix: &str) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for (field, value) in [("id", &self.id), ("name", &self.name), ("protocol", &self.protocol)] {
            if value.trim().is_empty() {
                errors.push(ValidationError {
                    field: format!("{}.{}", prefix, field),
                    message: format!("device {} cannot be empty", field),
                });
            }
        }
        errors
    }

    /// The device spec this entry describes.
    pub fn spec(&self) -> DeviceSpec {
        DeviceSpec {
            id: self.id.clone(),
            name: self.name.clone(),
            protocol: self.protocol.clone(),
            connection_params: self.params.clone(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `devices[0].id`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("factory-insight")
        .join("server.toml")
}
