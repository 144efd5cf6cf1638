//! WebSocket handler for real-time updates.
//!
//! A client first receives a `snapshot` message with the mode and every
//! device, then one message per [`MonitorEvent`].

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use insight_core::{Mode, Monitor, MonitorEvent};
use insight_types::Device;

use crate::state::AppState;

/// Create the WebSocket router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/ws", get(ws_handler))
}

/// Registry state sent when a client connects.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename = "snapshot")]
pub struct Snapshot {
    pub mode: Mode,
    pub devices: Vec<Device>,
}

impl Snapshot {
    fn of(monitor: &Monitor) -> Self {
        Self {
            mode: monitor.mode(),
            devices: monitor.devices().to_vec(),
        }
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe under the same lock as the snapshot so no event falls between them.
    let (mut rx, snapshot) = {
        let monitor = state.monitor.lock().await;
        (monitor.subscribe(), Snapshot::of(&monitor))
    };

    info!("WebSocket client connected");

    match serde_json::to_string(&snapshot) {
        Ok(json) => {
            if sender.send(Message::Text(json.into())).await.is_err() {
                info!("WebSocket client disconnected during initial snapshot");
                return;
            }
        }
        Err(e) => warn!("Failed to serialize snapshot: {}", e),
    }
    debug!("Sent snapshot of {} devices", snapshot.devices.len());

    let mut send_task = tokio::spawn(async move {
        loop {
            let event: MonitorEvent = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("WebSocket client lagged, {} events dropped", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let json = match serde_json::to_string(&event) {
                Ok(j) => j,
                Err(e) => {
                    warn!("Failed to serialize event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Drain client frames; pongs are answered by axum.
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket receive error: {}", e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        },
        _ = &mut recv_task => {
            send_task.abort();
        },
    }

    info!("WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::test_state;

    #[tokio::test]
    async fn test_snapshot_message() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;
        let snapshot = Snapshot::of(&*state.monitor.lock().await);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["type"], "snapshot");
        assert_eq!(json["mode"], "simulation");
        assert_eq!(json["devices"].as_array().unwrap().len(), 5);
    }
}
