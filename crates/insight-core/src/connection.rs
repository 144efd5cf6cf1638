//! Trait abstractions for live device connections.
//!
//! The update cycle only ever talks to devices through these traits, so the
//! mocked links in [`crate::mock`] can later be swapped for real fieldbus
//! drivers without touching the monitor.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use insight_types::{Device, Reading};

use crate::error::Result;

/// An open link to one device.
///
/// # Example
///
/// ```ignore
/// use insight_core::{LiveConnection, Result};
///
/// async fn poll(conn: &dyn LiveConnection) -> Result<()> {
///     let reading = conn.fetch().await?;
///     println!("{}: {:.1} °C", conn.device_id(), reading.temperature);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait LiveConnection: fmt::Debug + Send + Sync {
    /// Id of the device this link belongs to.
    fn device_id(&self) -> &str;

    /// Protocol label the link was opened with.
    fn protocol(&self) -> &str;

    /// Fetch a fresh reading.
    async fn fetch(&self) -> Result<Reading>;

    /// Tear the link down. Disconnecting twice is a no-op.
    async fn disconnect(&self);
}

/// Opens [`LiveConnection`]s for devices.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a link to `device`, dispatching on its protocol label.
    async fn connect(&self, device: &Device) -> Result<Arc<dyn LiveConnection>>;
}
