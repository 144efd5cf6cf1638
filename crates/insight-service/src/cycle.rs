//! Background update cycle control.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use insight_core::Monitor;

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    started_at: OffsetDateTime,
    interval: Duration,
}

/// Starts and stops the task that drives [`Monitor::run`].
#[derive(Default)]
pub struct Cycle {
    running: Mutex<Option<Running>>,
}

/// Snapshot of the cycle for status responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleInfo {
    pub started_at: OffsetDateTime,
    pub interval: Duration,
}

impl Cycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the cycle task. Returns `false` if it is already running.
    pub async fn start(&self, monitor: Arc<Mutex<Monitor>>, interval: Duration) -> bool {
        let mut running = self.running.lock().await;
        if running.as_ref().is_some_and(|r| !r.task.is_finished()) {
            return false;
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(Monitor::run(monitor, interval, cancel.clone()));
        *running = Some(Running {
            cancel,
            task,
            started_at: OffsetDateTime::now_utc(),
            interval,
        });
        info!("Cycle task started");
        true
    }

    /// Cancel the cycle task and wait for it to finish its current tick.
    ///
    /// Returns `false` if it was not running.
    pub async fn stop(&self) -> bool {
        let Some(running) = self.running.lock().await.take() else {
            return false;
        };
        running.cancel.cancel();
        if let Err(e) = running.task.await {
            warn!("Cycle task ended abnormally: {}", e);
        }
        info!("Cycle task stopped");
        true
    }

    /// Whether the cycle task is alive.
    pub async fn is_running(&self) -> bool {
        self.info().await.is_some()
    }

    /// Start time and interval of the running cycle.
    pub async fn info(&self) -> Option<CycleInfo> {
        self.running
            .lock()
            .await
            .as_ref()
            .filter(|r| !r.task.is_finished())
            .map(|r| CycleInfo {
                started_at: r.started_at,
                interval: r.interval,
            })
    }
}
