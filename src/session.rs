//! # Scan Session Module
//!
//! The state machine behind one bounded discovery session.
//!
//! ## Lifecycle
//! `Idle --start()--> Scanning --stop() | deadline | discovery failure--> Idle`
//!
//! `start()` clears the registry, optionally seeds it with known devices,
//! arms an auto-stop timer for the configured scan duration, flips the
//! scanning flag, arms the transport and starts a fresh notification
//! scheduler. Every stop path clears the flag, disarms the transport, halts
//! the scheduler (joining its thread) and emits `on_scanning_changed(false)`
//! once.
//!
//! ## Threads
//! - Control: the caller of `start` / `stop`
//! - Notifier: one per session, see `scheduler`
//! - Auto-stop timer: one per session, cancelled by dropping its channel
//! - Transport callbacks: deliver raw sightings through a `DiscoveryListener`
//!
//! Each successful start bumps a generation counter. Timers and listeners
//! carry the generation they were created for, so anything left over from a
//! superseded session is ignored.
//!
//! ## Locking
//! The control lock only covers state changes. It is released before the
//! notifier is joined and before any observer runs, so observers may call
//! `start` or `stop` from any callback. A `stop` issued from the seed snapshot
//! arrives before the session is scanning and is a no-op.

use crate::device::DeviceRecord;
use crate::error::ScanError;
use crate::observer::{ObserverId, ObserverSet, ScanObserver};
use crate::registry::DeviceRegistry;
use crate::scan_config::ScanConfig;
use crate::scheduler::NotificationScheduler;
use crate::transport::{DiscoveryListener, Transport};
use crossbeam_channel::{after, bounded, select, Sender};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;

/// State shared by the control, notifier and transport contexts
pub(crate) struct SharedState {
    pub(crate) registry: DeviceRegistry,
    pub(crate) observers: ObserverSet,
    scanning: AtomicBool,
    generation: AtomicU64,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        Self {
            registry: DeviceRegistry::new(),
            observers: ObserverSet::new(),
            scanning: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    pub(crate) fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    pub(crate) fn set_scanning(&self, scanning: bool) {
        self.scanning.store(scanning, Ordering::SeqCst);
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation && self.is_scanning()
    }

    /// Read a snapshot and fan it out to every observer
    pub(crate) fn publish_snapshot(&self) {
        let devices = self.registry.snapshot();
        log::debug!("Publishing {} devices", devices.len());
        self.observers.notify_snapshot(&devices);
    }
}

/// Pending deadline of one session. Dropping it cancels the timer.
struct AutoStopTimer {
    _cancel: Sender<()>,
}

impl AutoStopTimer {
    fn arm(session: Weak<SessionInner>, generation: u64, duration: Duration) -> Option<Self> {
        let (cancel_tx, cancel_rx) = bounded::<()>(0);

        let spawned = thread::Builder::new()
            .name("scan-auto-stop".to_string())
            .spawn(move || {
                select! {
                    recv(cancel_rx) -> _ => {
                        log::debug!("Auto-stop for session {} cancelled", generation);
                    }
                    recv(after(duration)) -> _ => {
                        if let Some(session) = session.upgrade() {
                            log::info!("Scan duration of {:?} elapsed", duration);
                            session.stop_generation(generation);
                        }
                    }
                }
            });

        match spawned {
            Ok(_) => Some(Self { _cancel: cancel_tx }),
            Err(e) => {
                log::error!("Failed to spawn auto-stop timer: {}", e);
                None
            }
        }
    }
}

/// Owned by the control lock
struct Control {
    config: ScanConfig,
    scheduler: Option<NotificationScheduler>,
    auto_stop: Option<AutoStopTimer>,
}

struct SessionInner {
    shared: Arc<SharedState>,
    transport: Arc<dyn Transport>,
    control: Mutex<Control>,
}

impl SessionInner {
    /// Tear the running session down.
    ///
    /// With `only` set, nothing happens unless that generation is current.
    /// Returns false if nothing was scanning.
    fn shutdown(&self, only: Option<u64>) -> bool {
        let (scheduler, stopped) = {
            let mut control = self.control.lock().unwrap();
            let current = self.shared.generation();
            if only.map_or(false, |generation| generation != current) {
                log::debug!("Ignoring stop for superseded session {:?}", only);
                return false;
            }

            control.auto_stop = None;
            let scheduler = control.scheduler.take();
            let was_scanning = self.shared.scanning.swap(false, Ordering::SeqCst);
            if was_scanning {
                // Under the lock so a following start's arm is never undone
                self.transport.disarm_discovery();
            }
            (scheduler, was_scanning.then_some(current))
        };

        if let Some(mut scheduler) = scheduler {
            scheduler.stop();
        }
        let Some(stopped) = stopped else {
            return false;
        };
        // A start that got in after the lock was released owns the state now
        if self.shared.generation() == stopped {
            self.shared.observers.notify_scanning_changed(false);
        }
        true
    }

    /// Stop on behalf of a timer or transport callback bound to `generation`
    fn stop_generation(&self, generation: u64) {
        if self.shutdown(Some(generation)) {
            log::info!("Scan stopped");
        }
    }
}

/// Forwards raw sightings of one session into its registry
struct SessionListener {
    session: Weak<SessionInner>,
    generation: u64,
}

impl DiscoveryListener for SessionListener {
    fn on_raw_discovery(&self, address: &str, name: &str, rssi: i32) {
        if let Some(session) = self.session.upgrade() {
            if session.shared.is_scanning() {
                // The registry re-checks the generation under its own lock
                session
                    .shared
                    .registry
                    .ingest_in(self.generation, address, name, rssi);
            }
        }
    }

    fn on_discovery_failed(&self, code: i32) {
        if let Some(session) = self.session.upgrade() {
            if !session.shared.is_current(self.generation) {
                return;
            }
            log::warn!("{}", ScanError::DiscoveryFailed(code));
            session.stop_generation(self.generation);
        }
    }
}

/// A bounded discovery session over one transport.
pub struct ScanSession {
    inner: Arc<SessionInner>,
}

impl ScanSession {
    pub fn new(transport: Arc<dyn Transport>, config: ScanConfig) -> Self {
        if !transport.is_adapter_present() {
            log::error!("{}", ScanError::AdapterUnavailable);
        }

        ScanSession {
            inner: Arc::new(SessionInner {
                shared: Arc::new(SharedState::new()),
                transport,
                control: Mutex::new(Control {
                    config,
                    scheduler: None,
                    auto_stop: None,
                }),
            }),
        }
    }

    /// Start a session, superseding any session still running.
    ///
    /// Fails with `AdapterUnavailable` when there is no adapter. A powered-off
    /// adapter is logged and otherwise ignored so the caller can retry later.
    pub fn start(&self) -> Result<(), ScanError> {
        let inner = &self.inner;
        let shared = &inner.shared;

        if !inner.transport.is_adapter_present() {
            return Err(ScanError::AdapterUnavailable);
        }
        if !inner.transport.is_adapter_powered() {
            log::warn!("Start scan skipped: {}", ScanError::AdapterPoweredOff);
            return Ok(());
        }

        // Retire the previous session and prepare a fresh device set
        let (generation, config, previous, seeded) = {
            let mut control = inner.control.lock().unwrap();
            control.auto_stop = None;
            let previous = control.scheduler.take();
            if shared.scanning.swap(false, Ordering::SeqCst) {
                log::debug!("Restarting a running scan");
                inner.transport.disarm_discovery();
            }

            // Bumped before the clear so old listeners are locked out first
            let generation = shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
            shared.registry.reset(generation);

            let config = control.config.clone();
            let seeded = config.seed_from_known_devices()
                && shared.registry.seed(&inner.transport.query_known_devices()) > 0;
            (generation, config, previous, seeded)
        };

        if let Some(mut scheduler) = previous {
            scheduler.stop();
        }
        if seeded {
            shared.publish_snapshot();
        }

        {
            let mut control = inner.control.lock().unwrap();
            if shared.generation() != generation {
                log::debug!("Session {} superseded before it began", generation);
                return Ok(());
            }

            control.auto_stop =
                AutoStopTimer::arm(Arc::downgrade(inner), generation, config.scan_duration());
            shared.set_scanning(true);

            let listener = Arc::new(SessionListener {
                session: Arc::downgrade(inner),
                generation,
            });
            let filtering = config.effective_filtering();
            if let Err(e) = inner.transport.arm_discovery(filtering, listener) {
                log::error!("Failed to start discovery: {}", e);
                control.auto_stop = None;
                shared.set_scanning(false);
                return Err(e);
            }
            match filtering {
                Some((filters, settings)) => log::info!(
                    "Scan started for {:?} with {} filters, {:?}",
                    config.scan_duration(),
                    filters.len(),
                    settings
                ),
                None => log::info!("Scan started for {:?}", config.scan_duration()),
            }

            control.scheduler = Some(NotificationScheduler::start(
                shared.clone(),
                config.notify_interval(),
            ));
        }

        // Skipped if a stop or restart already overtook this session
        if shared.is_current(generation) {
            shared.observers.notify_scanning_changed(true);
        }
        Ok(())
    }

    /// Stop the running session. A second call, or a call while the adapter
    /// is absent or powered off, does nothing.
    pub fn stop(&self) {
        let transport = &self.inner.transport;
        if !transport.is_adapter_present() {
            log::debug!("Stop scan skipped: {}", ScanError::AdapterUnavailable);
            return;
        }
        if !transport.is_adapter_powered() {
            log::warn!("Stop scan skipped: {}", ScanError::AdapterPoweredOff);
            return;
        }

        if self.inner.shutdown(None) {
            log::info!("Scan stopped");
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.inner.shared.is_scanning()
    }

    /// Current device list, strongest first. Still readable after stop.
    pub fn snapshot(&self) -> Vec<DeviceRecord> {
        self.inner.shared.registry.snapshot()
    }

    pub fn config(&self) -> ScanConfig {
        self.inner.control.lock().unwrap().config.clone()
    }

    /// Replace the configuration. Takes effect at the next `start`.
    pub fn set_config(&self, config: ScanConfig) {
        self.inner.control.lock().unwrap().config = config;
    }

    pub fn add_observer(&self, observer: Arc<dyn ScanObserver>) -> ObserverId {
        self.inner.shared.observers.add(observer)
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.inner.shared.observers.remove(id)
    }

    pub fn clear_observers(&self) {
        self.inner.shared.observers.clear();
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.inner.shutdown(None);
    }
}
