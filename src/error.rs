//! # Error Types Module
//!
//! Centralized error handling for btscan.
//!
//! ## Error Types
//! - `ScanError`: adapter and discovery failures surfaced by a scan session
//! - `ConfigError`: configuration file I/O and parsing errors
//!
//! ## Usage Examples
//! ```rust,ignore
//! // Session start surfaces a missing adapter
//! pub fn start(&self) -> Result<(), ScanError> { ... }
//!
//! // Config module uses ConfigError
//! pub fn load() -> Result<Config, ConfigError> { ... }
//! ```
//!
//! Scheduler and registry code never returns errors. Internal failures there
//! (a notifier thread that cannot be spawned, a double stop) are logged and
//! absorbed.

use std::fmt;

/// Errors that can occur while running a scan session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// No Bluetooth adapter behind the transport. Structural, not retried.
    AdapterUnavailable,
    /// Adapter exists but the radio is switched off. Start/stop become no-ops.
    AdapterPoweredOff,
    /// Transport reported a failure mid-session (platform error code)
    DiscoveryFailed(i32),
    /// Transport could not carry out a request
    Transport(String),
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::AdapterUnavailable => {
                write!(f, "No Bluetooth adapter available")
            }
            ScanError::AdapterPoweredOff => {
                write!(f, "Bluetooth adapter is powered off. Please enable Bluetooth.")
            }
            ScanError::DiscoveryFailed(code) => {
                write!(f, "Device discovery failed with code {}", code)
            }
            ScanError::Transport(msg) => {
                write!(f, "Bluetooth transport error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ScanError {}

/// Errors that can occur during configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read config file
    ReadFailed(std::io::Error),
    /// Failed to write config file
    WriteFailed(std::io::Error),
    /// Failed to parse config file
    ParseFailed(toml::de::Error),
    /// Failed to serialize config
    SerializeFailed(toml::ser::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ReadFailed(e) => {
                write!(f, "Failed to read config file: {}", e)
            }
            ConfigError::WriteFailed(e) => {
                write!(f, "Failed to write config file: {}", e)
            }
            ConfigError::ParseFailed(e) => {
                write!(f, "Failed to parse config file: {}", e)
            }
            ConfigError::SerializeFailed(e) => {
                write!(f, "Failed to serialize config: {}", e)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadFailed(e) => Some(e),
            ConfigError::WriteFailed(e) => Some(e),
            ConfigError::ParseFailed(e) => Some(e),
            ConfigError::SerializeFailed(e) => Some(e),
        }
    }
}
