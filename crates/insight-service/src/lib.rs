//! Update cycle host and HTTP REST API for the factory insight dashboard.
//!
//! This crate provides a service that:
//! - Drives the monitor's update cycle on a fixed interval
//! - Exposes the device registry, history, notifications and protocols over REST
//! - Proxies predictive analysis and chat to the configured AI provider
//! - Streams monitor events over a WebSocket
//!
//! # REST API Endpoints
//!
//! - `GET /api/health` - Service health check
//! - `GET /api/status` - Mode, cycle state and counts
//! - `GET|PUT /api/mode` - Read or switch between `simulation` and `live`
//! - `POST /api/cycle/start`, `POST /api/cycle/stop` - Control the update cycle
//! - `GET|POST /api/devices` - List or add devices
//! - `GET|PUT|DELETE /api/devices/{id}` - Read, edit or remove a device
//! - `GET /api/devices/{id}/history?start=&end=` - Readings in a day range
//! - `POST /api/devices/{id}/analysis` - Predictive maintenance report
//! - `GET /api/notifications`, `POST /api/notifications/read`,
//!   `POST /api/notifications/simulate` - Notification center
//! - `GET|POST /api/protocols` - Protocol catalog
//! - `GET|PUT /api/settings/ai` - AI provider settings (keys masked)
//! - `POST /api/chat` - Streamed assistant reply (server-sent events)
//! - `WS /api/ws` - Snapshot followed by real-time monitor events
//!
//! # Configuration
//!
//! The service reads `~/.config/factory-insight/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [cycle]
//! interval_ms = 2000
//! mode = "simulation"
//!
//! [[devices]]
//! id = "prs-010"
//! name = "Hydraulic Press"
//! protocol = "Profibus"
//! params = { stationAddress = 4 }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod api;
pub mod config;
pub mod cycle;
pub mod state;
pub mod ws;

pub use config::{
    AiConfig, Config, ConfigError, CycleConfig, DeviceConfig, ServerConfig, SimulationConfig,
    default_config_path,
};
pub use cycle::{Cycle, CycleInfo};
pub use state::AppState;

/// Build the full application router with tracing and permissive CORS.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(api::router())
        .merge(ws::router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Validate `config`, build the state and serve until Ctrl-C.
///
/// The update cycle starts when `cycle.autostart` is set.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    config.validate()?;
    let addr: SocketAddr = config.server.bind.parse()?;
    let autostart = config.cycle.autostart;

    let state = AppState::from_config(config).await?;
    if autostart {
        state.start_cycle().await;
    } else {
        info!("Update cycle not started");
    }

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(Arc::clone(&state)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.cycle.stop().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
