//! # btleplug Transport
//!
//! `Transport` implementation over the cross-platform `btleplug` crate.
//!
//! btleplug is async; the session is not. The transport owns a Tokio runtime
//! and blocks on it for the short adapter queries issued from the control
//! thread. Discovery itself runs as a spawned task that drains the adapter's
//! event stream and forwards sightings to the session's listener, so the
//! runtime's worker threads are the "transport callback context".
//!
//! `disarm_discovery` may be called from that very context (a failure
//! reported by the event task stops the session), so it never blocks: it
//! aborts the event task and spawns the `stop_scan` call.

use super::{DiscoveryListener, Filtering, Transport};
use crate::device::KnownDevice;
use crate::error::ScanError;
use crate::scan_config::{DiscoveryFilter, ScanMode};
use btleplug::api::{Central, CentralEvent, CentralState, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, PeripheralId};
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

/// The adapter's event stream ended while scanning
pub const FAILURE_EVENTS_CLOSED: i32 = 2;
/// The radio was switched off while scanning
pub const FAILURE_POWERED_OFF: i32 = 3;

pub struct BtleplugTransport {
    runtime: Option<Runtime>,
    adapter: Option<Adapter>,
    scan_task: Mutex<Option<JoinHandle<()>>>,
}

impl BtleplugTransport {
    /// Create the runtime and pick the first adapter.
    ///
    /// A machine without an adapter still yields a transport; it just reports
    /// `is_adapter_present() == false`.
    pub fn new() -> Result<Self, ScanError> {
        let runtime = Runtime::new().map_err(|e| {
            ScanError::Transport(format!("Failed to create async runtime: {}", e))
        })?;

        let adapter = match runtime.block_on(Self::first_adapter()) {
            Ok((info, adapter)) => {
                log::info!("Using Bluetooth adapter: {}", info);
                Some(adapter)
            }
            Err(e) => {
                log::error!("{}", e);
                None
            }
        };

        Ok(Self {
            runtime: Some(runtime),
            adapter,
            scan_task: Mutex::new(None),
        })
    }

    async fn first_adapter() -> Result<(String, Adapter), String> {
        let manager = Manager::new()
            .await
            .map_err(|e| format!("Failed to create BLE manager: {}", e))?;

        let adapters = manager
            .adapters()
            .await
            .map_err(|e| format!("Failed to get adapters: {}", e))?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or_else(|| "No Bluetooth adapter found".to_string())?;

        let info = adapter
            .adapter_info()
            .await
            .unwrap_or_else(|_| "unknown".to_string());
        Ok((info, adapter))
    }

    fn scan_filter(filtering: Filtering<'_>) -> ScanFilter {
        let Some((filters, settings)) = filtering else {
            return ScanFilter::default();
        };
        if settings.scan_mode != ScanMode::Balanced {
            log::debug!("btleplug does not support scan mode {:?}, ignoring", settings.scan_mode);
        }
        ScanFilter {
            services: filters
                .iter()
                .map(|filter| match filter {
                    DiscoveryFilter::Service(uuid) => *uuid,
                })
                .collect(),
        }
    }

    /// Event task: forward every sighting until the stream ends or the task is aborted
    async fn forward_events(adapter: Adapter, listener: Arc<dyn DiscoveryListener>) {
        let mut events = match adapter.events().await {
            Ok(events) => events,
            Err(e) => {
                log::error!("Failed to subscribe to adapter events: {}", e);
                listener.on_discovery_failed(FAILURE_EVENTS_CLOSED);
                return;
            }
        };

        while let Some(event) = events.next().await {
            match event {
                CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                    Self::forward_sighting(&adapter, &id, listener.as_ref()).await;
                }
                CentralEvent::StateUpdate(CentralState::PoweredOff) => {
                    log::warn!("Bluetooth adapter powered off during scan");
                    listener.on_discovery_failed(FAILURE_POWERED_OFF);
                    return;
                }
                _ => {}
            }
        }

        log::warn!("Adapter event stream closed");
        listener.on_discovery_failed(FAILURE_EVENTS_CLOSED);
    }

    async fn forward_sighting(adapter: &Adapter, id: &PeripheralId, listener: &dyn DiscoveryListener) {
        let peripheral = match adapter.peripheral(id).await {
            Ok(peripheral) => peripheral,
            Err(e) => {
                log::debug!("Peripheral {:?} vanished: {}", id, e);
                return;
            }
        };
        if let Ok(Some(props)) = peripheral.properties().await {
            let name = props.local_name.unwrap_or_default();
            let rssi = props.rssi.map(i32::from).unwrap_or(0);
            listener.on_raw_discovery(&props.address.to_string(), &name, rssi);
        }
    }
}

impl Transport for BtleplugTransport {
    fn is_adapter_present(&self) -> bool {
        self.adapter.is_some() && self.runtime.is_some()
    }

    fn is_adapter_powered(&self) -> bool {
        let (Some(runtime), Some(adapter)) = (&self.runtime, &self.adapter) else {
            return false;
        };
        // Unknown states (common right after launch) count as powered
        !matches!(
            runtime.block_on(adapter.adapter_state()),
            Ok(CentralState::PoweredOff)
        )
    }

    fn query_known_devices(&self) -> Vec<KnownDevice> {
        let (Some(runtime), Some(adapter)) = (&self.runtime, &self.adapter) else {
            return Vec::new();
        };

        runtime.block_on(async {
            let peripherals = match adapter.peripherals().await {
                Ok(peripherals) => peripherals,
                Err(e) => {
                    log::warn!("Failed to get known peripherals: {}", e);
                    return Vec::new();
                }
            };

            let mut known = Vec::new();
            for peripheral in peripherals {
                if let Ok(Some(props)) = peripheral.properties().await {
                    if let Some(local_name) = props.local_name {
                        known.push(KnownDevice::new(props.address.to_string(), local_name));
                    }
                }
            }
            known
        })
    }

    fn arm_discovery(
        &self,
        filtering: Filtering<'_>,
        listener: Arc<dyn DiscoveryListener>,
    ) -> Result<(), ScanError> {
        let (Some(runtime), Some(adapter)) = (&self.runtime, &self.adapter) else {
            return Err(ScanError::AdapterUnavailable);
        };

        let filter = Self::scan_filter(filtering);
        log::debug!("Starting btleplug scan with {} service filters", filter.services.len());
        runtime
            .block_on(adapter.start_scan(filter))
            .map_err(|e| ScanError::Transport(format!("Failed to start scan: {}", e)))?;

        let task = runtime.spawn(Self::forward_events(adapter.clone(), listener));
        if let Some(previous) = self.scan_task.lock().unwrap().replace(task) {
            previous.abort();
        }
        Ok(())
    }

    fn disarm_discovery(&self) {
        if let Some(task) = self.scan_task.lock().unwrap().take() {
            task.abort();
        }
        let (Some(runtime), Some(adapter)) = (&self.runtime, &self.adapter) else {
            return;
        };

        let adapter = adapter.clone();
        runtime.spawn(async move {
            if let Err(e) = adapter.stop_scan().await {
                log::warn!("Failed to stop scan: {}", e);
            }
        });
    }
}

impl Drop for BtleplugTransport {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
