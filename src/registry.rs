//! # Device Registry Module
//!
//! Holds the discovered set of one scan session, deduplicated by address.
//!
//! ## Concurrency
//! Three contexts touch the registry: the transport callback (`ingest`), the
//! notifier thread (`snapshot`) and the control thread (`clear`, `seed`).
//! A single mutex guards the collection so a snapshot always sees a
//! consistent point-in-time view.
//!
//! ## Epochs
//! `reset(epoch)` clears the set and tags it with the session it belongs to.
//! `ingest_in(epoch, ..)` checks the tag under the same lock, so a sighting
//! from a superseded session can never land in the freshly cleared set.
//!
//! ## Ordering
//! Records are kept in insertion order. `snapshot()` copies them and applies a
//! stable sort by RSSI descending, so equal strengths keep insertion order and
//! repeated snapshots are deterministic.

use crate::device::{DeviceRecord, KnownDevice};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Mutex;

/// State guarded by the registry lock
#[derive(Default)]
struct RegistryState {
    /// Records in insertion order
    records: Vec<DeviceRecord>,
    /// Address -> position in `records`
    index: HashMap<String, usize>,
    /// Session the records belong to
    epoch: u64,
}

impl RegistryState {
    fn upsert(&mut self, address: &str, name: &str, rssi: i32) {
        if let Some(&position) = self.index.get(address) {
            self.records[position].rssi = rssi;
            return;
        }
        self.index.insert(address.to_string(), self.records.len());
        self.records
            .push(DeviceRecord::new(address.to_string(), name.to_string(), rssi));
    }
}

#[derive(Default)]
pub struct DeviceRegistry {
    state: Mutex<RegistryState>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every record, keeping the current epoch.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.records.clear();
        state.index.clear();
    }

    /// Drop every record and start collecting for `epoch`.
    pub fn reset(&self, epoch: u64) {
        let mut state = self.state.lock().unwrap();
        state.records.clear();
        state.index.clear();
        state.epoch = epoch;
    }

    pub fn epoch(&self) -> u64 {
        self.state.lock().unwrap().epoch
    }

    /// Like `ingest`, but only while the registry still belongs to `epoch`.
    ///
    /// Returns false when the sighting was dropped for a stale epoch.
    pub fn ingest_in(&self, epoch: u64, address: &str, name: &str, rssi: i32) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.epoch != epoch {
            return false;
        }
        if !name.is_empty() {
            state.upsert(address, name, rssi);
        }
        true
    }

    /// Record one sighting.
    ///
    /// Sightings without a name are discarded. A repeat sighting of a known
    /// address refreshes its RSSI and leaves the name untouched.
    pub fn ingest(&self, address: &str, name: &str, rssi: i32) {
        if name.is_empty() {
            return;
        }
        self.state.lock().unwrap().upsert(address, name, rssi);
    }

    /// Bulk-ingest known devices with an unknown RSSI.
    ///
    /// Returns how many devices qualified (had a name).
    pub fn seed(&self, known: &[KnownDevice]) -> usize {
        let mut state = self.state.lock().unwrap();
        let mut seeded = 0;
        for device in known.iter().filter(|d| !d.name.is_empty()) {
            state.upsert(&device.address, &device.name, DeviceRecord::UNKNOWN_RSSI);
            seeded += 1;
        }
        seeded
    }

    /// Ordered copy of the current set, strongest signal first.
    pub fn snapshot(&self) -> Vec<DeviceRecord> {
        let mut records = self.state.lock().unwrap().records.clone();
        records.sort_by_key(|record| Reverse(record.rssi));
        records
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn addresses(records: &[DeviceRecord]) -> Vec<&str> {
        records.iter().map(|r| r.address.as_str()).collect()
    }

    #[test]
    fn test_empty_registry_snapshot() {
        let registry = DeviceRegistry::new();
        assert!(registry.snapshot().is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_sorted_by_rssi_with_stable_ties() {
        let registry = DeviceRegistry::new();
        registry.ingest("A", "Alpha", 5);
        registry.ingest("B", "Beta", 10);
        registry.ingest("C", "Gamma", 5);

        let snapshot = registry.snapshot();
        assert_eq!(addresses(&snapshot), vec!["B", "A", "C"]);
        // Repeated reads are identical
        assert_eq!(registry.snapshot(), snapshot);
    }

    #[test]
    fn test_repeat_sighting_updates_rssi_only() {
        let registry = DeviceRegistry::new();
        registry.ingest("A", "Alpha", 5);
        registry.ingest("A", "Alpha", 9);
        registry.ingest("A", "Renamed", 7);

        let snapshot = registry.snapshot();
        assert_eq!(registry.len(), 1);
        assert_eq!(snapshot[0].name, "Alpha");
        assert_eq!(snapshot[0].rssi, 7);
    }

    #[test]
    fn test_nameless_sighting_is_discarded() {
        let registry = DeviceRegistry::new();
        registry.ingest("A", "Alpha", -60);
        registry.ingest("B", "", -30);
        registry.ingest("A", "", -10);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].rssi, -60);
    }

    #[test]
    fn test_seed_uses_unknown_rssi_and_skips_nameless() {
        let registry = DeviceRegistry::new();
        let known = vec![
            KnownDevice::new("K1", "Headset"),
            KnownDevice::new("K2", ""),
            KnownDevice::new("K1", "Headset"),
        ];

        assert_eq!(registry.seed(&known), 2);
        assert_eq!(registry.len(), 1);

        // A live sighting of a seeded device refreshes its RSSI
        registry.ingest("K1", "Headset", -55);
        registry.ingest("L1", "Lamp", -70);
        let snapshot = registry.snapshot();
        assert_eq!(addresses(&snapshot), vec!["K1", "L1"]);
        assert_eq!(snapshot[0].rssi, -55);
    }

    #[test]
    fn test_snapshot_does_not_alias_registry() {
        let registry = DeviceRegistry::new();
        registry.ingest("A", "Alpha", -50);
        let before = registry.snapshot();
        registry.ingest("A", "Alpha", -20);
        assert_eq!(before[0].rssi, -50);
        assert_eq!(registry.snapshot()[0].rssi, -20);
    }

    #[test]
    fn test_clear_empties_registry() {
        let registry = DeviceRegistry::new();
        registry.ingest("A", "Alpha", -50);
        registry.clear();
        assert!(registry.is_empty());
        registry.ingest("A", "Other", -40);
        assert_eq!(registry.snapshot()[0].name, "Other");
    }

    #[test]
    fn test_stale_epoch_sighting_is_dropped() {
        let registry = DeviceRegistry::new();
        registry.reset(1);
        assert!(registry.ingest_in(1, "A", "Alpha", -50));

        registry.reset(2);
        assert_eq!(registry.epoch(), 2);
        assert!(!registry.ingest_in(1, "OLD", "Old", -10));
        assert!(registry.ingest_in(2, "B", "Beta", -40));
        assert!(registry.ingest_in(2, "C", "", -30));

        assert_eq!(addresses(&registry.snapshot()), vec!["B"]);
    }

    #[test]
    fn test_concurrent_ingest_keeps_one_record_per_address() {
        let registry = Arc::new(DeviceRegistry::new());
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for i in 0..200 {
                        let address = format!("dev-{}", i % 10);
                        registry.ingest(&address, "Device", worker * 1000 + i);
                        let _ = registry.snapshot();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 10);
        let snapshot = registry.snapshot();
        assert!(snapshot.windows(2).all(|w| w[0].rssi >= w[1].rssi));
    }
}
