//! Edge-triggered status notifications.
//!
//! A notification fires only when a device leaves the `Normal` tier between
//! two consecutive ticks. Escalating from `Warning` to `Critical`, staying in
//! an alert tier, or recovering never notifies.

use std::collections::HashMap;

use time::OffsetDateTime;

use insight_types::{AlertLevel, Device, DeviceStatus, NOTIFICATION_CAPACITY, Notification};

/// Status of every device as of the previous tick.
pub type StatusMap = HashMap<String, DeviceStatus>;

/// Snapshot the statuses of a device list.
pub fn status_map<'a>(devices: impl IntoIterator<Item = &'a Device>) -> StatusMap {
    devices
        .into_iter()
        .map(|d| (d.id.clone(), d.status))
        .collect()
}

/// Compare the new statuses against the previous map.
///
/// Returns one unread notification, in device order, for each device whose
/// previous status was `Normal` and whose current status is an alert tier.
/// Devices missing from `previous` never notify.
pub fn detect_transitions<'a>(
    previous: &StatusMap,
    devices: impl IntoIterator<Item = &'a Device>,
    now: OffsetDateTime,
) -> Vec<Notification> {
    devices
        .into_iter()
        .filter(|d| previous.get(&d.id) == Some(&DeviceStatus::Normal))
        .filter_map(|d| {
            AlertLevel::from_status(d.status)
                .map(|level| Notification::status_changed(&d.id, &d.name, level, now))
        })
        .collect()
}

/// Bounded notification list, most recent first.
#[derive(Debug, Clone, Default)]
pub struct NotificationCenter {
    items: Vec<Notification>,
    next_id: u64,
}

impl NotificationCenter {
    /// Create an empty center.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a batch, keeping its internal order, and assign ids.
    ///
    /// The list is truncated to [`NOTIFICATION_CAPACITY`] afterwards, dropping
    /// the oldest entries. Returns the stored batch with ids filled in.
    pub fn extend(&mut self, batch: Vec<Notification>) -> Vec<Notification> {
        if batch.is_empty() {
            return batch;
        }
        let batch: Vec<Notification> = batch
            .into_iter()
            .map(|mut n| {
                self.next_id += 1;
                n.id = self.next_id;
                n
            })
            .collect();

        let mut items = batch.clone();
        items.append(&mut self.items);
        items.truncate(NOTIFICATION_CAPACITY);
        self.items = items;
        batch
    }

    /// Mark every notification as read.
    pub fn mark_all_read(&mut self) {
        for n in &mut self.items {
            n.is_read = true;
        }
    }

    /// Number of unread notifications.
    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.is_read).count()
    }

    /// Notifications, most recent first.
    pub fn list(&self) -> &[Notification] {
        &self.items
    }

    /// Drop every notification. Ids keep increasing.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Number of notifications held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no notifications are held.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
