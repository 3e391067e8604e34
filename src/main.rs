use btscan::config::Config;
use btscan::{BtleplugTransport, ChannelObserver, ScanError, ScanSession, ScanUpdate};
use std::sync::mpsc;
use std::sync::Arc;

fn main() -> Result<(), ScanError> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load().unwrap_or_else(|e| {
        log::warn!("{}, using defaults", e);
        Config::default()
    });

    let transport = Arc::new(BtleplugTransport::new()?);
    let session = ScanSession::new(transport, config.scan_config());

    // Snapshots arrive on the notifier thread; print them from this one
    let (sender, receiver) = mpsc::channel::<ScanUpdate>();
    session.add_observer(Arc::new(ChannelObserver::new(sender)));

    session.start()?;
    if !session.is_scanning() {
        log::error!("Scan did not start, is Bluetooth switched on?");
        return Ok(());
    }

    while let Ok(update) = receiver.recv() {
        match update {
            ScanUpdate::DeviceList(devices) => {
                println!(
                    "[{}] {} devices",
                    chrono::Local::now().format("%H:%M:%S"),
                    devices.len()
                );
                for device in &devices {
                    println!("  {:>4} dBm  {}  {}", device.rssi, device.address, device.name);
                }
            }
            ScanUpdate::Scanning(true) => log::info!("Scanning..."),
            ScanUpdate::Scanning(false) => break,
        }
    }

    let devices = session.snapshot();
    log::info!("Scan finished, {} devices found", devices.len());
    Ok(())
}
