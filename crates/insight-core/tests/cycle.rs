//! Integration tests for the update cycle.
//!
//! Every test uses a zero-latency mock connector so nothing waits on the
//! simulated link delays.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use insight_core::{
    DeviceRegistry, DriftModel, Mode, MockConnector, Monitor, MonitorEvent, SimulationProfile,
    Simulator,
};
use insight_types::{AlertLevel, ConnectionStatus, DeviceStatus, NOTIFICATION_CAPACITY};

/// Temperature climbs by exactly 30 °C per tick, other channels hold still.
fn heating_profile() -> SimulationProfile {
    let still = DriftModel {
        soft_bound: 0.0,
        relax: 0.0,
        runaway: 0.0,
        noise_span: 0.0,
        noise_bias: 0.0,
    };
    SimulationProfile {
        temperature: DriftModel {
            runaway: 30.0,
            ..still
        },
        pressure: still,
        vibration: still,
    }
}

fn heating_monitor() -> Monitor {
    Monitor::new(
        DeviceRegistry::factory_floor(),
        Arc::new(MockConnector::instant()),
    )
    .with_simulator(Simulator::seeded(0).with_profile(heating_profile()))
}

fn live_monitor() -> (Monitor, Arc<MockConnector>) {
    let connector = Arc::new(MockConnector::instant().with_failure_rate(0.0));
    let monitor = Monitor::new(DeviceRegistry::factory_floor(), connector.clone());
    (monitor, connector)
}

#[tokio::test]
async fn notifications_fire_only_on_leaving_normal() {
    let mut monitor = heating_monitor();

    // 55 -> 85 Warning, 65 -> 95 Critical, 78 -> 100 (already Warning),
    // 45 -> 75 still Normal, 50 -> 80 Warning.
    let first = monitor.tick().await;
    let ids: Vec<_> = first
        .notifications
        .iter()
        .map(|n| n.device_id.as_str())
        .collect();
    assert_eq!(ids, vec!["cnc-001", "rbt-002", "vlv-005"]);
    assert_eq!(first.notifications[0].level, AlertLevel::Warning);
    assert_eq!(first.notifications[1].level, AlertLevel::Critical);

    // Everything is now clamped at 100 °C. Only Assembly Line Delta was
    // still Normal, so it is the only new alert.
    let second = monitor.tick().await;
    assert_eq!(second.notifications.len(), 1);
    assert_eq!(second.notifications[0].device_id, "asm-004");

    // Repeated Critical never notifies.
    let third = monitor.tick().await;
    assert!(third.notifications.is_empty());

    let listed: Vec<_> = monitor
        .notifications()
        .list()
        .iter()
        .map(|n| n.device_id.as_str())
        .collect();
    assert_eq!(listed, vec!["asm-004", "cnc-001", "rbt-002", "vlv-005"]);
    assert_eq!(monitor.notifications().unread_count(), 4);

    monitor.mark_all_read();
    assert_eq!(monitor.notifications().unread_count(), 0);
    assert!(
        monitor
            .devices()
            .iter()
            .all(|d| d.status == DeviceStatus::Critical)
    );
}

#[tokio::test]
async fn new_device_does_not_notify_on_first_tick() {
    let mut monitor = heating_monitor();
    monitor
        .add_device(insight_types::DeviceSpec::new("hot-1", "Furnace", "HART"))
        .await
        .unwrap();

    // Starts around 50 °C and jumps to ~80 °C: Warning, but it has no
    // previous status yet.
    let report = monitor.tick().await;
    assert!(report.notifications.iter().all(|n| n.device_id != "hot-1"));
    assert_eq!(monitor.device("hot-1").unwrap().status, DeviceStatus::Warning);
}

#[tokio::test]
async fn history_and_ranges_hold_over_many_ticks() {
    let mut monitor = Monitor::new(
        DeviceRegistry::factory_floor(),
        Arc::new(MockConnector::instant()),
    )
    .with_simulator(Simulator::seeded(11));

    for _ in 0..120 {
        monitor.tick().await;
        for device in monitor.devices() {
            assert!(device.current.is_within_ranges());
            assert!(device.history.len() <= 50);
            assert_eq!(
                device.status,
                monitor.thresholds().evaluate(&device.current)
            );
        }
    }
    assert!(monitor.devices().iter().all(|d| d.history.len() == 50));
    assert!(monitor.notifications().len() <= NOTIFICATION_CAPACITY);
}

#[tokio::test]
async fn fetch_failure_is_isolated_to_one_device() {
    let (mut monitor, connector) = live_monitor();
    monitor.set_mode(Mode::Live).await;

    connector
        .connection("rbt-002")
        .await
        .unwrap()
        .set_should_fail(true);

    let report = monitor.tick().await;
    assert_eq!(report.updated.len(), 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].device_id, "rbt-002");

    let robot = monitor.device("rbt-002").unwrap();
    assert_eq!(robot.connection, ConnectionStatus::Error);
    assert!(!monitor.is_linked("rbt-002"));
    assert_eq!(monitor.link_count(), 4);

    // The failed device is no longer polled.
    let report = monitor.tick().await;
    assert_eq!(report.updated.len(), 4);
    assert!(report.failures.is_empty());
    assert_eq!(monitor.device("rbt-002").unwrap().history.len(), 1);
}

#[tokio::test]
async fn reentering_live_mode_retries_failed_devices() {
    let connector = Arc::new(MockConnector::instant().with_failure_rate(0.0));
    connector.refuse("pmp-003").await;
    let mut monitor = Monitor::new(DeviceRegistry::factory_floor(), connector.clone());

    let report = monitor.set_mode(Mode::Live).await;
    assert_eq!(report.connected.len(), 4);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(
        report.failed[0].error,
        "Connection failed for pmp-003: Serial port could not be opened for Coolant Pump Gamma"
    );
    assert_eq!(
        monitor.device("pmp-003").unwrap().connection,
        ConnectionStatus::Error
    );

    connector.accept("pmp-003").await;
    let report = monitor.set_mode(Mode::Live).await;
    assert_eq!(report.connected, vec!["pmp-003".to_string()]);
    assert_eq!(monitor.link_count(), 5);
}

#[tokio::test]
async fn switching_to_simulation_disconnects_everything() {
    let (mut monitor, connector) = live_monitor();
    monitor.set_mode(Mode::Live).await;
    let link = connector.connection("cnc-001").await.unwrap();
    assert!(link.is_connected());

    monitor.set_mode(Mode::Simulation).await;
    assert!(!link.is_connected());
    assert_eq!(monitor.link_count(), 0);
    assert!(
        monitor
            .devices()
            .iter()
            .all(|d| d.connection == ConnectionStatus::Disconnected)
    );

    let report = monitor.tick().await;
    assert_eq!(report.mode, Mode::Simulation);
    assert_eq!(report.updated.len(), 5);
}

#[tokio::test]
async fn events_follow_mode_switch() {
    let (mut monitor, _connector) = live_monitor();
    let mut rx = monitor.subscribe();

    monitor.set_mode(Mode::Live).await;

    let first = rx.recv().await.unwrap();
    assert!(matches!(first, MonitorEvent::ModeChanged { mode: Mode::Live }));

    let mut connecting = 0;
    let mut connected = 0;
    while let Ok(event) = rx.try_recv() {
        if let MonitorEvent::ConnectionChanged { status, .. } = event {
            match status {
                ConnectionStatus::Connecting => connecting += 1,
                ConnectionStatus::Connected => connected += 1,
                _ => {}
            }
        }
    }
    assert_eq!(connecting, 5);
    assert_eq!(connected, 5);
}

#[tokio::test(start_paused = true)]
async fn run_loop_ticks_until_cancelled() {
    let monitor = Arc::new(Mutex::new(
        Monitor::new(
            DeviceRegistry::factory_floor(),
            Arc::new(MockConnector::instant()),
        )
        .with_simulator(Simulator::seeded(5)),
    ));
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(Monitor::run(
        monitor.clone(),
        Duration::from_secs(2),
        cancel.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(5_500)).await;
    cancel.cancel();
    handle.await.unwrap();

    let guard = monitor.lock().await;
    // Ticks at 2 s and 4 s, on top of the seeded reading.
    assert!(guard.devices().iter().all(|d| d.history.len() == 3));
}
