//! # Notification Scheduler Module
//!
//! Periodically pushes device-list snapshots to observers while a session is
//! scanning, at a cadence independent of how fast raw discovery events arrive.
//!
//! ## Architecture
//! - One notifier thread per session; a scheduler is never restarted
//! - A crossbeam `done` channel doubles as the sleep: the thread waits on it
//!   with a timeout, and dropping the sender wakes it immediately
//! - `stop()` drops the sender and joins, so once it returns no
//!   scheduler-originated notification is in flight
//!
//! The first notification fires one interval after `start`. The loop also
//! checks the session's live scanning flag on every tick and exits on its own
//! when the session has stopped.

use crate::session::SharedState;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub struct NotificationScheduler {
    done: Option<Sender<()>>,
    notifier_thread: Option<JoinHandle<()>>,
}

impl NotificationScheduler {
    /// Spawn the notifier thread for one session
    pub(crate) fn start(shared: Arc<SharedState>, interval: Duration) -> Self {
        let (done_tx, done_rx) = bounded::<()>(0);

        let notifier_thread = thread::Builder::new()
            .name("scan-notifier".to_string())
            .spawn(move || Self::notify_loop(done_rx, shared, interval));

        match notifier_thread {
            Ok(handle) => Self {
                done: Some(done_tx),
                notifier_thread: Some(handle),
            },
            Err(e) => {
                log::error!("Failed to spawn notifier thread: {}", e);
                Self {
                    done: None,
                    notifier_thread: None,
                }
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.notifier_thread
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Cancel the loop and wait for it to exit. No-op when already stopped.
    pub fn stop(&mut self) {
        // Disconnecting the channel interrupts the sleep
        self.done.take();

        if let Some(handle) = self.notifier_thread.take() {
            if handle.thread().id() == thread::current().id() {
                // Stopped from an observer callback on the notifier thread itself;
                // the loop exits as soon as the callback returns.
                log::debug!("Notifier stopped from its own thread, not joining");
                return;
            }
            if handle.join().is_err() {
                log::error!("Notifier thread panicked");
            }
        }
    }

    /// Notifier thread loop
    fn notify_loop(done: Receiver<()>, shared: Arc<SharedState>, interval: Duration) {
        log::debug!("Notifier started, interval {:?}", interval);
        while shared.is_scanning() {
            match done.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    if !shared.is_scanning() {
                        break;
                    }
                    shared.publish_snapshot();
                }
                // Sender dropped: stop() was called
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        log::debug!("Notifier stopped");
    }
}

impl Drop for NotificationScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
