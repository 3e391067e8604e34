//! # Scan Configuration Module
//!
//! In-memory configuration of a scan session. Out-of-range durations are
//! clamped, never rejected.
//!
//! ## Settings
//! - `scan_duration`: how long a session runs before it stops itself
//!   (100 ms ..= 180 s, default 14 s)
//! - `notify_interval`: cadence of device-list snapshots
//!   (100 ms ..= 5 s, default 2 s)
//! - `seed_from_known_devices`: pre-populate the list with devices the
//!   adapter already knows (default on)
//! - `discovery_filters` / `discovery_settings`: handed to the transport.
//!   They only take effect together: filters are applied when the list is
//!   non-empty and settings are present.

use std::time::Duration;
use uuid::Uuid;

pub const MIN_SCAN_DURATION: Duration = Duration::from_millis(100);
pub const MAX_SCAN_DURATION: Duration = Duration::from_millis(180_000);
pub const DEFAULT_SCAN_DURATION: Duration = Duration::from_millis(14_000);

pub const MIN_NOTIFY_INTERVAL: Duration = Duration::from_millis(100);
pub const MAX_NOTIFY_INTERVAL: Duration = Duration::from_millis(5_000);
pub const DEFAULT_NOTIFY_INTERVAL: Duration = Duration::from_millis(2_000);

/// Restricts discovery to devices advertising a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryFilter {
    Service(Uuid),
}

/// Radio duty cycle requested from the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    LowPower,
    #[default]
    Balanced,
    LowLatency,
}

/// Transport-specific scan settings. Transports may ignore what they cannot honour.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscoverySettings {
    pub scan_mode: ScanMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    scan_duration: Duration,
    notify_interval: Duration,
    seed_from_known_devices: bool,
    discovery_filters: Vec<DiscoveryFilter>,
    discovery_settings: Option<DiscoverySettings>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scan_duration: DEFAULT_SCAN_DURATION,
            notify_interval: DEFAULT_NOTIFY_INTERVAL,
            seed_from_known_devices: true,
            discovery_filters: Vec::new(),
            discovery_settings: None,
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scan_duration(&self) -> Duration {
        self.scan_duration
    }

    pub fn set_scan_duration(&mut self, duration: Duration) {
        self.scan_duration = duration.clamp(MIN_SCAN_DURATION, MAX_SCAN_DURATION);
    }

    pub fn notify_interval(&self) -> Duration {
        self.notify_interval
    }

    pub fn set_notify_interval(&mut self, interval: Duration) {
        self.notify_interval = interval.clamp(MIN_NOTIFY_INTERVAL, MAX_NOTIFY_INTERVAL);
    }

    pub fn seed_from_known_devices(&self) -> bool {
        self.seed_from_known_devices
    }

    pub fn set_seed_from_known_devices(&mut self, seed: bool) {
        self.seed_from_known_devices = seed;
    }

    pub fn discovery_filters(&self) -> &[DiscoveryFilter] {
        &self.discovery_filters
    }

    pub fn add_discovery_filter(&mut self, filter: DiscoveryFilter) {
        self.discovery_filters.push(filter);
    }

    pub fn clear_discovery_filters(&mut self) {
        self.discovery_filters.clear();
    }

    pub fn discovery_settings(&self) -> Option<&DiscoverySettings> {
        self.discovery_settings.as_ref()
    }

    /// `None` is ignored; settings once given are only replaced, never unset.
    pub fn set_discovery_settings(&mut self, settings: Option<DiscoverySettings>) {
        if let Some(settings) = settings {
            self.discovery_settings = Some(settings);
        }
    }

    /// Filters and settings to arm the transport with, or `None` for an
    /// unfiltered scan.
    pub fn effective_filtering(&self) -> Option<(&[DiscoveryFilter], &DiscoverySettings)> {
        match &self.discovery_settings {
            Some(settings) if !self.discovery_filters.is_empty() => {
                Some((&self.discovery_filters, settings))
            }
            _ => None,
        }
    }

    pub fn with_scan_duration(mut self, duration: Duration) -> Self {
        self.set_scan_duration(duration);
        self
    }

    pub fn with_notify_interval(mut self, interval: Duration) -> Self {
        self.set_notify_interval(interval);
        self
    }

    pub fn with_seed_from_known_devices(mut self, seed: bool) -> Self {
        self.set_seed_from_known_devices(seed);
        self
    }

    pub fn with_discovery_filter(mut self, filter: DiscoveryFilter) -> Self {
        self.add_discovery_filter(filter);
        self
    }

    pub fn with_discovery_settings(mut self, settings: DiscoverySettings) -> Self {
        self.set_discovery_settings(Some(settings));
        self
    }
}
