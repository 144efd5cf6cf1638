//! REST API endpoints for the insight-service.
//!
//! # Locking
//!
//! - **`state.monitor`** (Mutex): held for registry reads and mutations. Never
//!   held across an AI provider call; handlers clone the devices they need.
//! - **`state.protocols`**, **`state.ai`** (RwLock): read for `GET`, write for
//!   mutations.
//!
//! When more than one is needed, acquire `protocols` before `monitor`.
//!
//! ## Error Handling
//!
//! All endpoints return structured JSON errors via [`AppError`]:
//! `{"error": "..."}` with 400, 404, 409, 500 or 502.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{error, info};

use insight_ai::{
    AiError, AiSettings, Analysis, CHAT_ERROR_MESSAGE, ChatMessage, ChatSession, backend_for,
    predictive_analysis,
};
use insight_core::explorer::log_view;
use insight_core::{ConnectReport, DateRange, HistoryStats, Mode};
use insight_types::{
    AlertLevel, ConnectionParams, Device, DeviceSpec, Notification, ProtocolCatalog, ProtocolInfo,
    Reading, ValidationError,
};

use crate::state::AppState;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        // Health and status
        .route("/api/health", get(health))
        .route("/api/status", get(get_status))
        // Cycle control
        .route("/api/mode", get(get_mode).put(set_mode))
        .route("/api/cycle/start", post(cycle_start))
        .route("/api/cycle/stop", post(cycle_stop))
        // Devices
        .route("/api/devices", get(list_devices).post(add_device))
        .route(
            "/api/devices/{id}",
            get(get_device).put(update_device).delete(remove_device),
        )
        .route("/api/devices/{id}/history", get(get_history))
        .route("/api/devices/{id}/analysis", post(analyze_device))
        // Notifications
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/read", post(mark_notifications_read))
        .route("/api/notifications/simulate", post(simulate_notification))
        // Protocols
        .route("/api/protocols", get(list_protocols).post(add_protocol))
        // AI
        .route("/api/settings/ai", get(get_ai_settings).put(update_ai_settings))
        .route("/api/chat", post(chat))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}

/// Service status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Seconds since the service started.
    pub uptime_seconds: u64,
    pub mode: Mode,
    pub cycle: CycleStatus,
    /// Registered devices.
    pub devices: usize,
    /// Devices holding a live link.
    pub linked_devices: usize,
    pub unread_notifications: usize,
}

/// Update cycle status.
#[derive(Debug, Serialize)]
pub struct CycleStatus {
    pub running: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    pub uptime_seconds: Option<u64>,
    pub interval_ms: u64,
}

fn seconds_since(start: OffsetDateTime) -> u64 {
    (OffsetDateTime::now_utc() - start).whole_seconds().max(0) as u64
}

/// Get service status including cycle state and counts.
async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let cycle = state.cycle.info().await;
    let monitor = state.monitor.lock().await;

    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
        uptime_seconds: seconds_since(state.started_at),
        mode: monitor.mode(),
        cycle: CycleStatus {
            running: cycle.is_some(),
            started_at: cycle.map(|c| c.started_at),
            uptime_seconds: cycle.map(|c| seconds_since(c.started_at)),
            interval_ms: cycle
                .map(|c| c.interval.as_millis() as u64)
                .unwrap_or(state.config.cycle.interval_ms),
        },
        devices: monitor.devices().len(),
        linked_devices: monitor.link_count(),
        unread_notifications: monitor.notifications().unread_count(),
    })
}

// ==========================================================================
// Mode and cycle
// ==========================================================================

/// Mode response.
#[derive(Debug, Serialize)]
pub struct ModeResponse {
    pub mode: Mode,
    /// Connect outcome when entering live mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect: Option<ConnectReport>,
}

/// Mode switch request.
#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: String,
}

async fn get_mode(State(state): State<Arc<AppState>>) -> Json<ModeResponse> {
    Json(ModeResponse {
        mode: state.monitor.lock().await.mode(),
        connect: None,
    })
}

/// Switch between simulation and live mode.
///
/// Entering live mode waits for every connect attempt to settle.
async fn set_mode(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ModeRequest>,
) -> Result<Json<ModeResponse>, AppError> {
    let mode: Mode = request.mode.parse()?;
    let report = state.monitor.lock().await.set_mode(mode).await;
    Ok(Json(ModeResponse {
        mode,
        connect: (mode == Mode::Live).then_some(report),
    }))
}

/// Response for cycle control actions.
#[derive(Debug, Serialize)]
pub struct CycleActionResponse {
    pub success: bool,
    pub message: String,
    pub running: bool,
}

async fn cycle_start(State(state): State<Arc<AppState>>) -> Json<CycleActionResponse> {
    if !state.start_cycle().await {
        return Json(CycleActionResponse {
            success: false,
            message: "Cycle is already running".to_string(),
            running: true,
        });
    }
    Json(CycleActionResponse {
        success: true,
        message: "Cycle started".to_string(),
        running: true,
    })
}

async fn cycle_stop(State(state): State<Arc<AppState>>) -> Json<CycleActionResponse> {
    if !state.cycle.stop().await {
        return Json(CycleActionResponse {
            success: false,
            message: "Cycle is not running".to_string(),
            running: false,
        });
    }
    Json(CycleActionResponse {
        success: true,
        message: "Cycle stopped".to_string(),
        running: false,
    })
}

// ==========================================================================
// Devices
// ==========================================================================

/// Editable device fields; the id comes from the path.
#[derive(Debug, Deserialize)]
pub struct DeviceUpdate {
    pub name: String,
    pub protocol: String,
    #[serde(default)]
    pub connection_params: ConnectionParams,
}

async fn ensure_protocol(
    catalog: &tokio::sync::RwLock<ProtocolCatalog>,
    protocol: &str,
) -> Result<(), AppError> {
    if catalog.read().await.get(protocol).is_none() {
        return Err(insight_core::Error::InvalidProtocol(protocol.to_string()).into());
    }
    Ok(())
}

async fn list_devices(State(state): State<Arc<AppState>>) -> Json<Vec<Device>> {
    Json(state.monitor.lock().await.devices().to_vec())
}

async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Device>, AppError> {
    Ok(Json(state.monitor.lock().await.device(&id)?.clone()))
}

/// Add a device.
///
/// # Errors
///
/// - [`AppError::BadRequest`] for a blank field or an unknown protocol.
/// - [`AppError::Conflict`] if the id is taken.
async fn add_device(
    State(state): State<Arc<AppState>>,
    Json(spec): Json<DeviceSpec>,
) -> Result<(StatusCode, Json<Device>), AppError> {
    spec.validate()?;
    ensure_protocol(&state.protocols, &spec.protocol).await?;
    let device = state.monitor.lock().await.add_device(spec).await?;
    Ok((StatusCode::CREATED, Json(device)))
}

async fn update_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<DeviceUpdate>,
) -> Result<Json<Device>, AppError> {
    let spec = DeviceSpec {
        id: id.clone(),
        name: update.name,
        protocol: update.protocol,
        connection_params: update.connection_params,
    };
    spec.validate()?;
    ensure_protocol(&state.protocols, &spec.protocol).await?;
    let device = state.monitor.lock().await.update_device(&id, spec).await?;
    Ok(Json(device))
}

async fn remove_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.monitor.lock().await.remove_device(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// History explorer query; both days are inclusive, default the last week.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl HistoryQuery {
    fn range(&self, today: time::Date) -> Result<DateRange, AppError> {
        let default = DateRange::last_week(today);
        let parse = |value: &Option<String>, fallback, field: &str| match value {
            Some(s) => DateRange::parse_day(s)
                .map_err(|_| AppError::BadRequest(format!("Invalid {field} date '{s}', expected YYYY-MM-DD"))),
            None => Ok(fallback),
        };
        let start = parse(&self.start, default.start, "start")?;
        let end = parse(&self.end, default.end, "end")?;
        if start > end {
            return Err(AppError::BadRequest(format!(
                "start ({start}) must not be after end ({end})"
            )));
        }
        Ok(DateRange::new(start, end))
    }
}

/// History explorer response.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub device_id: String,
    pub start: String,
    pub end: String,
    /// Readings in range, newest first.
    pub readings: Vec<Reading>,
    /// Per-channel statistics; null when no readings match.
    pub stats: Option<HistoryStats>,
}

async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let range = query.range(OffsetDateTime::now_utc().date())?;
    let readings = {
        let monitor = state.monitor.lock().await;
        log_view(&monitor.device(&id)?.history, &range)
    };
    Ok(Json(HistoryResponse {
        device_id: id,
        start: range.start.to_string(),
        end: range.end.to_string(),
        stats: HistoryStats::compute(&readings),
        readings,
    }))
}

/// Predictive analysis of a device's latest reading; `null` when the provider
/// is unconfigured or fails.
async fn analyze_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Option<Analysis>>, AppError> {
    let device = state.monitor.lock().await.device(&id)?.clone();
    let settings = state.ai.read().await.effective();
    Ok(Json(
        predictive_analysis(&settings, state.http.clone(), &device).await,
    ))
}

// ==========================================================================
// Notifications
// ==========================================================================

/// Notification list response.
#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub unread: usize,
    /// Most recent first.
    pub notifications: Vec<Notification>,
}

/// Test notification request.
#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    pub level: AlertLevel,
}

async fn list_notifications(State(state): State<Arc<AppState>>) -> Json<NotificationsResponse> {
    let monitor = state.monitor.lock().await;
    let center = monitor.notifications();
    Json(NotificationsResponse {
        unread: center.unread_count(),
        notifications: center.list().to_vec(),
    })
}

async fn mark_notifications_read(State(state): State<Arc<AppState>>) -> Json<NotificationsResponse> {
    let mut monitor = state.monitor.lock().await;
    monitor.mark_all_read();
    Json(NotificationsResponse {
        unread: 0,
        notifications: monitor.notifications().list().to_vec(),
    })
}

async fn simulate_notification(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SimulateRequest>,
) -> Result<(StatusCode, Json<Notification>), AppError> {
    let notification = state
        .monitor
        .lock()
        .await
        .simulate_notification(request.level)
        .ok_or_else(|| AppError::NotFound("No devices to raise a notification for".to_string()))?;
    Ok((StatusCode::CREATED, Json(notification)))
}

// ==========================================================================
// Protocols
// ==========================================================================

/// New protocol request.
#[derive(Debug, Deserialize)]
pub struct ProtocolRequest {
    pub name: String,
    pub description: String,
}

async fn list_protocols(State(state): State<Arc<AppState>>) -> Json<ProtocolCatalog> {
    Json(state.protocols.read().await.clone())
}

async fn add_protocol(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProtocolRequest>,
) -> Result<(StatusCode, Json<ProtocolInfo>), AppError> {
    let mut catalog = state.protocols.write().await;
    let info = catalog.add(&request.name, &request.description)?.clone();
    info!("Protocol '{}' added", info.name);
    Ok((StatusCode::CREATED, Json(info)))
}

// ==========================================================================
// AI settings and chat
// ==========================================================================

/// AI settings with every key masked.
async fn get_ai_settings(State(state): State<Arc<AppState>>) -> Json<AiSettings> {
    Json(state.ai.read().await.settings().masked())
}

/// Replace the AI settings. Keys sent back exactly as masked are kept.
async fn update_ai_settings(
    State(state): State<Arc<AppState>>,
    Json(incoming): Json<AiSettings>,
) -> Result<Json<AiSettings>, AppError> {
    let mut store = state.ai.write().await;
    let mut settings = store.settings().clone();
    settings.apply_update(incoming);
    store.update(settings)?;
    info!("AI settings updated (provider {})", store.settings().provider);
    Ok(Json(store.settings().masked()))
}

/// One chat turn.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Earlier turns, oldest first.
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

/// Stream a chat reply as server-sent events.
///
/// Emits a `token` event (JSON string) per streamed token and ends with one
/// `message` event carrying the final model message. A failed turn yields no
/// tokens and a `message` with the apology text.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if request.message.trim().is_empty() {
        return Err(AppError::BadRequest("Message cannot be empty".to_string()));
    }

    let devices = state.monitor.lock().await.devices().to_vec();
    let settings = state.ai.read().await.effective();
    let backend = backend_for(&settings, state.http.clone());
    let (tx, rx) = mpsc::unbounded_channel::<Event>();

    tokio::spawn(async move {
        let mut session = ChatSession::with_history(request.history);
        let reply = match backend {
            Ok(backend) => {
                let token_tx = tx.clone();
                session
                    .send_with(&request.message, backend.as_ref(), &devices, move |token| {
                        let _ = token_tx.send(json_event("token", token));
                    })
                    .await
                    .cloned()
            }
            Err(e) => {
                error!("Error in chat with {}: {}", settings.provider, e);
                Some(ChatMessage::model(CHAT_ERROR_MESSAGE))
            }
        };
        if let Some(reply) = reply {
            let _ = tx.send(json_event("message", &reply));
        }
    });

    let stream = futures::StreamExt::map(UnboundedReceiverStream::new(rx), Ok);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn json_event<T: Serialize + ?Sized>(name: &str, data: &T) -> Event {
    Event::default()
        .event(name)
        .data(serde_json::to_string(data).unwrap_or_else(|_| "null".to_string()))
}

// ==========================================================================
// Errors
// ==========================================================================

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    /// A device link or AI provider failed.
    Upstream(String),
    Internal(String),
}

impl From<insight_core::Error> for AppError {
    fn from(e: insight_core::Error) -> Self {
        use insight_core::Error;
        match e {
            Error::DeviceNotFound(_) => AppError::NotFound(e.to_string()),
            Error::DuplicateDevice(_) => AppError::Conflict(e.to_string()),
            Error::InvalidDevice(_) | Error::InvalidProtocol(_) | Error::UnknownMode(_) => {
                AppError::BadRequest(e.to_string())
            }
            Error::ConnectionFailed { .. } | Error::FetchFailed { .. } | Error::NotConnected(_) => {
                AppError::Upstream(e.to_string())
            }
            _ => AppError::Internal(e.to_string()),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<AiError> for AppError {
    fn from(e: AiError) -> Self {
        match e {
            AiError::MissingApiKey(_) | AiError::MissingBaseUrl(_) => {
                AppError::BadRequest(e.to_string())
            }
            AiError::Settings { .. } => AppError::Internal(e.to_string()),
            _ => AppError::Upstream(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}
