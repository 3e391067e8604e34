//! # Configuration Management Module
//!
//! Persistent scan settings stored in platform-appropriate locations.
//! Handles loading, saving, and providing defaults for configuration options.
//!
//! ## Settings
//! - `scan_duration_ms`: how long one scan session runs
//! - `notify_interval_ms`: how often the device list is pushed to observers
//! - `seed_from_known_devices`: start the list with bonded/cached devices
//! - `service_filters`: service UUIDs to restrict discovery to
//! - `scan_mode`: radio duty cycle; filters only apply together with it
//!
//! ## Storage Location
//! - macOS: ~/Library/Application Support/btscan/config.toml
//! - Linux: ~/.config/btscan/config.toml
//! - Windows: %APPDATA%\btscan\config.toml
//!
//! Values are stored as written; clamping happens when the file is turned
//! into a `ScanConfig`.

use crate::error::ConfigError;
use crate::scan_config::{DiscoveryFilter, DiscoverySettings, ScanConfig, ScanMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan_duration_ms: u64,
    pub notify_interval_ms: u64,
    pub seed_from_known_devices: bool,
    pub service_filters: Vec<String>,
    pub scan_mode: Option<ScanMode>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan_duration_ms: 14_000,
            notify_interval_ms: 2_000,
            seed_from_known_devices: true,
            service_filters: Vec::new(),
            scan_mode: None,
        }
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("btscan")
            .join("config.toml")
    }

    /// Load config from the default location, or create default if it doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::config_path())
    }

    /// Load config from `path`, writing a default file there if it is missing
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(contents) => {
                let config = toml::from_str(&contents).map_err(ConfigError::ParseFailed)?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config at {}, writing defaults", path.display());
                let config = Self::default();
                config.save_to(path)?;
                Ok(config)
            }
            Err(e) => Err(ConfigError::ReadFailed(e)),
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::config_path())
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::WriteFailed)?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(ConfigError::SerializeFailed)?;
        fs::write(path, toml_string).map_err(ConfigError::WriteFailed)?;

        Ok(())
    }

    /// Clamped session configuration. Unparseable UUIDs are skipped.
    pub fn scan_config(&self) -> ScanConfig {
        let mut config = ScanConfig::new()
            .with_scan_duration(Duration::from_millis(self.scan_duration_ms))
            .with_notify_interval(Duration::from_millis(self.notify_interval_ms))
            .with_seed_from_known_devices(self.seed_from_known_devices);

        for filter in &self.service_filters {
            match Uuid::parse_str(filter) {
                Ok(uuid) => config.add_discovery_filter(DiscoveryFilter::Service(uuid)),
                Err(e) => log::warn!("Ignoring service filter {:?}: {}", filter, e),
            }
        }
        config.set_discovery_settings(
            self.scan_mode
                .map(|scan_mode| DiscoverySettings { scan_mode }),
        );

        config
    }
}
