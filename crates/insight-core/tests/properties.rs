//! Property-based tests for status derivation and the notification center.

use proptest::prelude::*;
use time::OffsetDateTime;

use insight_core::{NotificationCenter, Simulator, Thresholds};
use insight_types::{
    AlertLevel, DeviceStatus, NOTIFICATION_CAPACITY, Notification, Reading,
};

fn expected_status(r: &Reading) -> DeviceStatus {
    if r.temperature > 85.0 || r.pressure > 200.0 || r.vibration > 5.0 {
        DeviceStatus::Critical
    } else if r.temperature > 75.0 || r.pressure > 180.0 || r.vibration > 3.5 {
        DeviceStatus::Warning
    } else {
        DeviceStatus::Normal
    }
}

proptest! {
    #[test]
    fn status_is_a_pure_function_of_the_reading(
        t in 20.0f64..=100.0,
        p in 50.0f64..=250.0,
        v in 0.0f64..=10.0,
    ) {
        let thresholds = Thresholds::default();
        let reading = Reading::clamped(OffsetDateTime::UNIX_EPOCH, t, p, v);
        let first = thresholds.evaluate(&reading);
        prop_assert_eq!(first, thresholds.evaluate(&reading));
        prop_assert_eq!(first, expected_status(&reading));
    }

    #[test]
    fn simulated_readings_stay_in_range(
        seed in any::<u64>(),
        t in 20.0f64..=100.0,
        p in 50.0f64..=250.0,
        v in 0.0f64..=10.0,
        steps in 1usize..100,
    ) {
        let mut sim = Simulator::seeded(seed);
        let mut reading = Reading::clamped(OffsetDateTime::UNIX_EPOCH, t, p, v);
        for _ in 0..steps {
            reading = sim.next_reading_at(&reading, OffsetDateTime::UNIX_EPOCH);
            prop_assert!(reading.is_within_ranges());
        }
    }

    #[test]
    fn notification_center_is_bounded_and_newest_first(
        batches in proptest::collection::vec(0usize..8, 0..40),
    ) {
        let mut center = NotificationCenter::new();
        let mut total = 0u64;
        let mut last_batch = 0usize;
        for size in batches {
            let batch = (0..size)
                .map(|i| Notification::status_changed(
                    format!("d{i}"),
                    format!("Device {i}"),
                    AlertLevel::Warning,
                    OffsetDateTime::UNIX_EPOCH,
                ))
                .collect();
            center.extend(batch);
            prop_assert!(center.len() <= NOTIFICATION_CAPACITY);
            total += size as u64;
            if size > 0 {
                last_batch = size;
            }
        }

        prop_assert_eq!(center.len(), (total as usize).min(NOTIFICATION_CAPACITY));
        if total > 0 {
            // The newest batch sits at the front, in its own order.
            let list = center.list();
            prop_assert_eq!(list[0].id, total - last_batch as u64 + 1);
            prop_assert_eq!(list[last_batch - 1].id, total);
        }
    }
}
