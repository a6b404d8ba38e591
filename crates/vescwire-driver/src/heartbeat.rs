use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, error, trace, warn};

use crate::error::{DriverError, Result};
use crate::link::{lock, SharedLink};

/// Background thread that writes a keep-alive frame at a fixed period.
///
/// The device stops the motor if it hears nothing for a while, so this runs
/// for as long as a command should stay in effect. Each write takes the link
/// lock, which keeps it out of the middle of a request/response exchange.
#[derive(Debug)]
pub(crate) struct Heartbeat {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Heartbeat {
    /// Spawn the keep-alive loop. The first frame goes out one `interval` after start.
    pub(crate) fn spawn(link: SharedLink, frame: Bytes, interval: Duration) -> Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("vesc-heartbeat".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }

                let result = lock(&link).write_raw(&frame);
                match result {
                    Ok(()) => trace!("keep-alive sent"),
                    Err(err @ (DriverError::ConnectionLost | DriverError::Transport(_))) => {
                        error!(error = %err, "link down, heartbeat stopping");
                        break;
                    }
                    Err(err) => warn!(error = %err, "keep-alive write failed"),
                }
            })
            .map_err(DriverError::Heartbeat)?;

        debug!(interval_ms = interval.as_millis() as u64, "heartbeat started");
        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Whether the loop is still alive.
    pub(crate) fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signal the loop and wait for it to exit. No keep-alive is written after this returns.
    pub(crate) fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if handle.join().is_err() {
            error!("heartbeat thread panicked");
        }
        debug!("heartbeat stopped");
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}
