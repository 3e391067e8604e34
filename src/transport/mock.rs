//! Scriptable transport for session tests.

use super::{DiscoveryListener, Filtering, Transport};
use crate::device::KnownDevice;
use crate::error::ScanError;
use crate::scan_config::{DiscoveryFilter, DiscoverySettings};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) struct MockTransport {
    pub present: AtomicBool,
    pub powered: AtomicBool,
    pub fail_arm: AtomicBool,
    pub known: Mutex<Vec<KnownDevice>>,
    pub arm_count: AtomicUsize,
    pub disarm_count: AtomicUsize,
    pub last_filtering: Mutex<Option<(Vec<DiscoveryFilter>, DiscoverySettings)>>,
    listener: Mutex<Option<Arc<dyn DiscoveryListener>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            present: AtomicBool::new(true),
            powered: AtomicBool::new(true),
            fail_arm: AtomicBool::new(false),
            known: Mutex::new(Vec::new()),
            arm_count: AtomicUsize::new(0),
            disarm_count: AtomicUsize::new(0),
            last_filtering: Mutex::new(None),
            listener: Mutex::new(None),
        }
    }

    pub fn absent() -> Self {
        let transport = Self::new();
        transport.present.store(false, Ordering::SeqCst);
        transport
    }

    pub fn with_known(known: Vec<KnownDevice>) -> Self {
        let transport = Self::new();
        *transport.known.lock().unwrap() = known;
        transport
    }

    /// Listener handed over by the most recent arm, even after disarm
    pub fn listener(&self) -> Option<Arc<dyn DiscoveryListener>> {
        self.listener.lock().unwrap().clone()
    }

    pub fn emit(&self, address: &str, name: &str, rssi: i32) {
        if let Some(listener) = self.listener() {
            listener.on_raw_discovery(address, name, rssi);
        }
    }

    pub fn fail(&self, code: i32) {
        if let Some(listener) = self.listener() {
            listener.on_discovery_failed(code);
        }
    }

    pub fn arms(&self) -> usize {
        self.arm_count.load(Ordering::SeqCst)
    }

    pub fn disarms(&self) -> usize {
        self.disarm_count.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    fn is_adapter_present(&self) -> bool {
        self.present.load(Ordering::SeqCst)
    }

    fn is_adapter_powered(&self) -> bool {
        self.powered.load(Ordering::SeqCst)
    }

    fn query_known_devices(&self) -> Vec<KnownDevice> {
        self.known.lock().unwrap().clone()
    }

    fn arm_discovery(
        &self,
        filtering: Filtering<'_>,
        listener: Arc<dyn DiscoveryListener>,
    ) -> Result<(), ScanError> {
        if self.fail_arm.load(Ordering::SeqCst) {
            return Err(ScanError::Transport("scan could not be started".to_string()));
        }
        self.arm_count.fetch_add(1, Ordering::SeqCst);
        *self.last_filtering.lock().unwrap() =
            filtering.map(|(filters, settings)| (filters.to_vec(), settings.clone()));
        *self.listener.lock().unwrap() = Some(listener);
        Ok(())
    }

    fn disarm_discovery(&self) {
        self.disarm_count.fetch_add(1, Ordering::SeqCst);
    }
}
