//! Bounded Bluetooth discovery sessions.
//!
//! A `ScanSession` runs a time-boxed scan over a `Transport`, deduplicates
//! sightings by address in a `DeviceRegistry`, and pushes ordered snapshots of
//! the discovered set to `ScanObserver`s at a fixed cadence.

pub mod config;
pub mod device;
pub mod error;
pub mod observer;
pub mod registry;
pub mod scan_config;
pub mod scheduler;
pub mod session;
pub mod transport;

pub use device::{DeviceRecord, KnownDevice};
pub use error::{ConfigError, ScanError};
pub use observer::{ChannelObserver, ObserverId, ObserverSet, ScanObserver, ScanUpdate};
pub use registry::DeviceRegistry;
pub use scan_config::{DiscoveryFilter, DiscoverySettings, ScanConfig, ScanMode};
pub use session::ScanSession;
pub use transport::{BtleplugTransport, DiscoveryListener, Transport};
