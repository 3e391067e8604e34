//! # Observer Module
//!
//! Fan-out of session events to interested parties.
//!
//! ## Key Components
//! - `ScanObserver`: the two-method capability an observer implements
//! - `ObserverSet`: insertion-ordered set of observers, addressed by `ObserverId`
//! - `ChannelObserver`: forwards events into a `std::sync::mpsc` channel so a
//!   UI or main thread can drain them at its own pace
//!
//! Delivery works on a copy of the observer list taken at call time, so an
//! observer added or removed during delivery does not affect the delivery in
//! flight. Callbacks run on the notifying thread and are expected to be fast.

use crate::device::DeviceRecord;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

/// Receives device-list snapshots and scanning-state changes.
pub trait ScanObserver: Send + Sync {
    /// Ordered snapshot of the discovered set, strongest signal first
    fn on_snapshot(&self, devices: &[DeviceRecord]);

    fn on_scanning_changed(&self, scanning: bool);
}

/// Handle returned by `ObserverSet::add`, used to remove the observer later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Default)]
pub struct ObserverSet {
    observers: Mutex<Vec<(ObserverId, Arc<dyn ScanObserver>)>>,
    next_id: AtomicU64,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, observer: Arc<dyn ScanObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().unwrap().push((id, observer));
        id
    }

    /// Returns false when the id was not registered
    pub fn remove(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.lock().unwrap();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub fn clear(&self) {
        self.observers.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.observers.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn notify_snapshot(&self, devices: &[DeviceRecord]) {
        for observer in self.current() {
            observer.on_snapshot(devices);
        }
    }

    pub fn notify_scanning_changed(&self, scanning: bool) {
        for observer in self.current() {
            observer.on_scanning_changed(scanning);
        }
    }

    // Copy taken under the lock; callbacks run without it held.
    fn current(&self) -> Vec<Arc<dyn ScanObserver>> {
        self.observers
            .lock()
            .unwrap()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect()
    }
}

/// Events forwarded by `ChannelObserver`
#[derive(Debug, Clone, PartialEq)]
pub enum ScanUpdate {
    DeviceList(Vec<DeviceRecord>),
    Scanning(bool),
}

/// Observer that pushes every event into an mpsc channel.
#[derive(Clone)]
pub struct ChannelObserver {
    sender: Sender<ScanUpdate>,
}

impl ChannelObserver {
    pub fn new(sender: Sender<ScanUpdate>) -> Self {
        Self { sender }
    }
}

// Send updates to the receiving thread
impl ScanObserver for ChannelObserver {
    fn on_snapshot(&self, devices: &[DeviceRecord]) {
        if let Err(why) = self.sender.send(ScanUpdate::DeviceList(devices.to_vec())) {
            log::debug!("Could not forward device list: {:?}", why);
        }
    }

    fn on_scanning_changed(&self, scanning: bool) {
        if let Err(why) = self.sender.send(ScanUpdate::Scanning(scanning)) {
            log::debug!("Could not forward scanning state: {:?}", why);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::mpsc;

    /// Observer that records everything it receives, shared with session tests
    #[derive(Default)]
    pub(crate) struct RecordingObserver {
        pub snapshots: Mutex<Vec<Vec<DeviceRecord>>>,
        pub states: Mutex<Vec<bool>>,
    }

    impl RecordingObserver {
        pub fn snapshot_count(&self) -> usize {
            self.snapshots.lock().unwrap().len()
        }

        pub fn states(&self) -> Vec<bool> {
            self.states.lock().unwrap().clone()
        }

        pub fn last_snapshot(&self) -> Option<Vec<DeviceRecord>> {
            self.snapshots.lock().unwrap().last().cloned()
        }
    }

    impl ScanObserver for RecordingObserver {
        fn on_snapshot(&self, devices: &[DeviceRecord]) {
            self.snapshots.lock().unwrap().push(devices.to_vec());
        }

        fn on_scanning_changed(&self, scanning: bool) {
            self.states.lock().unwrap().push(scanning);
        }
    }

    /// Removes a target observer from inside its own callback
    struct RemovingObserver {
        set: Arc<ObserverSet>,
        target: Mutex<Option<ObserverId>>,
        calls: Mutex<usize>,
    }

    impl ScanObserver for RemovingObserver {
        fn on_snapshot(&self, _devices: &[DeviceRecord]) {}

        fn on_scanning_changed(&self, _scanning: bool) {
            *self.calls.lock().unwrap() += 1;
            if let Some(id) = self.target.lock().unwrap().take() {
                self.set.remove(id);
            }
        }
    }

    #[test]
    fn test_add_remove_clear() {
        let set = ObserverSet::new();
        let first = set.add(Arc::new(RecordingObserver::default()));
        let second = set.add(Arc::new(RecordingObserver::default()));
        assert_ne!(first, second);
        assert_eq!(set.len(), 2);

        assert!(set.remove(first));
        assert!(!set.remove(first));
        assert_eq!(set.len(), 1);

        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn test_delivery_reaches_every_observer() {
        let set = ObserverSet::new();
        let a = Arc::new(RecordingObserver::default());
        let b = Arc::new(RecordingObserver::default());
        set.add(a.clone());
        set.add(b.clone());

        let devices = vec![DeviceRecord::new("A".into(), "Alpha".into(), -40)];
        set.notify_snapshot(&devices);
        set.notify_scanning_changed(true);

        for observer in [&a, &b] {
            assert_eq!(observer.last_snapshot(), Some(devices.clone()));
            assert_eq!(observer.states(), vec![true]);
        }
    }

    /// Appends its label to a log shared by several observers
    struct LabelledObserver {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl ScanObserver for LabelledObserver {
        fn on_snapshot(&self, _devices: &[DeviceRecord]) {
            self.log.lock().unwrap().push(self.label);
        }

        fn on_scanning_changed(&self, _scanning: bool) {
            self.log.lock().unwrap().push(self.label);
        }
    }

    #[test]
    fn test_delivery_follows_insertion_order() {
        let set = ObserverSet::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ids = Vec::new();
        for label in ["first", "second", "third"] {
            ids.push(set.add(Arc::new(LabelledObserver {
                label,
                log: log.clone(),
            })));
        }

        set.notify_scanning_changed(true);
        set.notify_snapshot(&[]);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["first", "second", "third", "first", "second", "third"]
        );

        // Removing from the middle keeps the others in order
        log.lock().unwrap().clear();
        set.remove(ids[1]);
        set.add(Arc::new(LabelledObserver {
            label: "fourth",
            log: log.clone(),
        }));
        set.notify_scanning_changed(false);
        assert_eq!(*log.lock().unwrap(), vec!["first", "third", "fourth"]);
    }

    #[test]
    fn test_removal_during_delivery_does_not_affect_inflight() {
        let set = Arc::new(ObserverSet::new());
        let remover = Arc::new(RemovingObserver {
            set: set.clone(),
            target: Mutex::new(None),
            calls: Mutex::new(0),
        });
        let victim = Arc::new(RecordingObserver::default());

        set.add(remover.clone());
        let victim_id = set.add(victim.clone());
        *remover.target.lock().unwrap() = Some(victim_id);

        set.notify_scanning_changed(true);
        // Removed mid-delivery, but still part of that delivery
        assert_eq!(victim.states(), vec![true]);

        set.notify_scanning_changed(false);
        assert_eq!(victim.states(), vec![true]);
        assert_eq!(*remover.calls.lock().unwrap(), 2);
    }

    #[test]
    fn test_channel_observer_forwards_updates() {
        let (sender, receiver) = mpsc::channel();
        let observer = ChannelObserver::new(sender);

        observer.on_scanning_changed(true);
        observer.on_snapshot(&[DeviceRecord::new("A".into(), "Alpha".into(), 1)]);

        assert_eq!(receiver.recv().unwrap(), ScanUpdate::Scanning(true));
        match receiver.recv().unwrap() {
            ScanUpdate::DeviceList(devices) => assert_eq!(devices.len(), 1),
            other => panic!("unexpected update: {:?}", other),
        }
    }

    #[test]
    fn test_channel_observer_survives_closed_receiver() {
        let (sender, receiver) = mpsc::channel();
        drop(receiver);
        let observer = ChannelObserver::new(sender);
        observer.on_scanning_changed(false);
    }
}
