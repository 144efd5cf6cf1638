//! Application state shared across handlers.
//!
//! The [`Monitor`] sits behind a single mutex. A tick holds it for its whole
//! duration, so API mutations and ticks are serialized and ticks never
//! overlap. Handlers copy what they need out of the monitor and release the
//! lock before doing anything slow, in particular before calling an AI
//! provider.
//!
//! Monitor events go out on a broadcast channel sized by
//! `server.broadcast_buffer`. Sending never blocks; a WebSocket client that
//! falls behind loses the oldest events.

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use insight_ai::SettingsStore;
use insight_core::{DeviceRegistry, EventDispatcher, MockConnector, Mode, Monitor, Simulator};
use insight_types::ProtocolCatalog;

use crate::config::Config;
use crate::cycle::Cycle;

/// Shared application state.
pub struct AppState {
    /// Registry, cycle state and notifications.
    pub monitor: Arc<Mutex<Monitor>>,
    /// Known protocols.
    pub protocols: RwLock<ProtocolCatalog>,
    /// AI provider settings.
    pub ai: RwLock<SettingsStore>,
    /// Client for AI provider requests.
    pub http: reqwest::Client,
    /// Configuration the service was started with.
    pub config: Config,
    /// Background update cycle.
    pub cycle: Cycle,
    /// When the service started.
    pub started_at: OffsetDateTime,
}

impl AppState {
    /// Build the state from a validated configuration.
    ///
    /// Seeds the registry from `[[devices]]` (or the factory floor when
    /// none are configured) and enters the configured mode. The cycle is not
    /// started.
    pub async fn from_config(config: Config) -> Result<Arc<Self>, insight_ai::AiError> {
        let mut connector = MockConnector::new().with_latency_scale(config.simulation.latency_scale);
        if let Some(rate) = config.simulation.failure_rate {
            connector = connector.with_failure_rate(rate);
        }
        let simulator = match config.simulation.seed {
            Some(seed) => Simulator::seeded(seed),
            None => Simulator::new(),
        };

        let registry = if config.devices.is_empty() {
            DeviceRegistry::factory_floor()
        } else {
            DeviceRegistry::new()
        };
        let mut monitor = Monitor::new(registry, Arc::new(connector))
            .with_simulator(simulator)
            .with_events(EventDispatcher::new(config.server.broadcast_buffer));

        for device in &config.devices {
            if let Err(e) = monitor.add_device(device.spec()).await {
                warn!("Skipping configured device {}: {}", device.id, e);
            }
        }
        if config.cycle.mode == Mode::Live {
            let report = monitor.set_mode(Mode::Live).await;
            info!(
                "Live mode: {} connected, {} failed",
                report.connected.len(),
                report.failed.len()
            );
        }

        let ai = SettingsStore::load(config.ai.settings_path());
        info!("AI provider: {}", ai.settings().provider);

        Ok(Arc::new(Self {
            monitor: Arc::new(Mutex::new(monitor)),
            protocols: RwLock::new(ProtocolCatalog::default()),
            ai: RwLock::new(ai),
            http: insight_ai::http_client()?,
            config,
            cycle: Cycle::new(),
            started_at: OffsetDateTime::now_utc(),
        }))
    }

    /// Start the update cycle with the configured interval.
    pub async fn start_cycle(&self) -> bool {
        self.cycle
            .start(Arc::clone(&self.monitor), self.config.cycle.interval())
            .await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// State with zero-latency, never-failing links and a private settings file.
    pub async fn test_state(dir: &tempfile::TempDir) -> Arc<AppState> {
        let mut config = Config::default();
        config.simulation.latency_scale = 0.0;
        config.simulation.failure_rate = Some(0.0);
        config.simulation.seed = Some(11);
        config.cycle.interval_ms = 100;
        config.ai.settings_path = Some(dir.path().join("ai-settings.json"));
        AppState::from_config(config).await.unwrap()
    }
}
