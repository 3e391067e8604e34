//! # Transport Boundary
//!
//! The radio driver that actually discovers devices lives behind the
//! `Transport` trait. The scan session only ever talks to this trait, so one
//! state machine serves every platform. The platform layer picks the
//! implementation at startup.
//!
//! ## Directions
//! - Outbound (session -> transport): `Transport`
//! - Inbound (transport -> session): `DiscoveryListener`, handed to the
//!   transport when discovery is armed

pub mod ble;
#[cfg(test)]
pub(crate) mod mock;

use crate::device::KnownDevice;
use crate::error::ScanError;
use crate::scan_config::{DiscoveryFilter, DiscoverySettings};
use std::sync::Arc;

pub use self::ble::BtleplugTransport;

/// Filters and settings to arm discovery with; `None` scans unfiltered.
pub type Filtering<'a> = Option<(&'a [DiscoveryFilter], &'a DiscoverySettings)>;

/// Receives raw discovery events from a transport.
///
/// Called on a transport-owned context, possibly many times per second.
pub trait DiscoveryListener: Send + Sync {
    /// One sighting of a device. `name` may be empty.
    fn on_raw_discovery(&self, address: &str, name: &str, rssi: i32);

    /// Discovery stopped on its own; `code` is transport specific.
    fn on_discovery_failed(&self, code: i32);
}

pub trait Transport: Send + Sync {
    fn is_adapter_present(&self) -> bool;

    fn is_adapter_powered(&self) -> bool;

    /// Devices the adapter already knows about (bonded or cached)
    fn query_known_devices(&self) -> Vec<KnownDevice>;

    /// Start delivering raw discovery events to `listener`.
    fn arm_discovery(
        &self,
        filtering: Filtering<'_>,
        listener: Arc<dyn DiscoveryListener>,
    ) -> Result<(), ScanError>;

    /// Stop delivering events. Must not block on the listener's context.
    fn disarm_discovery(&self);
}
