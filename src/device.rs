use std::fmt;

/// One discovered device: identity plus the latest signal strength.
///
/// `name` is fixed at first sighting; only `rssi` is refreshed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub address: String,
    pub name: String,
    pub rssi: i32,
}

impl DeviceRecord {
    /// RSSI used for devices that were seeded rather than actually heard
    pub const UNKNOWN_RSSI: i32 = 0;

    pub fn new(address: String, name: String, rssi: i32) -> Self {
        Self { address, name, rssi }
    }
}

impl fmt::Display for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {} , rssi = {}", self.name, self.address, self.rssi)
    }
}

/// A device the adapter already knows about (bonded / cached).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownDevice {
    pub address: String,
    pub name: String,
}

impl KnownDevice {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
        }
    }
}
