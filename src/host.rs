//! # Tokio Host Integration
//!
//! Runs [`PhyDriver::process`] from a tokio task whenever the driver's wake
//! signal fires. The driver is shared behind a `tokio::sync::Mutex` so the
//! upper layer can keep calling entry points from other tasks.
//!
//! ```rust,ignore
//! let wake = Arc::new(Notify::new());
//! let phy = PhyDriver::new(engine, config, table, wake.clone())?;
//! let phy = Arc::new(Mutex::new(phy));
//!
//! let (callbacks, mut events) = ChannelCallbacks::new();
//! let poll = spawn_poll_loop(phy.clone(), callbacks, wake);
//!
//! phy.lock().await.receive(11)?;
//! while let Some(event) = events.recv().await {
//!     // PhyEvent::ReceiveDone { .. }
//! }
//! poll.stop().await?;
//! ```

use crate::error::PhyError;
use crate::radio::driver::{PhyCallbacks, PhyDriver};
use crate::radio::engine::RadioEngine;
use crate::radio::frame::RadioFrame;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex, Notify};
use tokio::task::{JoinError, JoinHandle};

/// Owned copy of an upcall
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhyEvent {
    TransmitStarted {
        frame: RadioFrame,
    },
    TransmitDone {
        frame: RadioFrame,
        ack: Option<RadioFrame>,
        result: Result<(), PhyError>,
    },
    ReceiveDone {
        frame: RadioFrame,
        result: Result<(), PhyError>,
    },
    EnergyScanDone {
        rssi_dbm: Option<i8>,
    },
    DiagTransmitDone {
        frame: RadioFrame,
        result: Result<(), PhyError>,
    },
    DiagReceiveDone {
        frame: RadioFrame,
        result: Result<(), PhyError>,
    },
}

/// Forwards every upcall as a [`PhyEvent`] over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelCallbacks {
    tx: mpsc::UnboundedSender<PhyEvent>,
}

impl ChannelCallbacks {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PhyEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: PhyEvent) {
        // Receiver gone means nobody is listening any more
        let _ = self.tx.send(event);
    }
}

impl PhyCallbacks for ChannelCallbacks {
    fn transmit_done(
        &mut self,
        frame: &RadioFrame,
        ack: Option<&RadioFrame>,
        result: Result<(), PhyError>,
    ) {
        self.send(PhyEvent::TransmitDone {
            frame: frame.clone(),
            ack: ack.cloned(),
            result,
        });
    }

    fn receive_done(&mut self, frame: &RadioFrame, result: Result<(), PhyError>) {
        self.send(PhyEvent::ReceiveDone {
            frame: frame.clone(),
            result,
        });
    }

    fn energy_scan_done(&mut self, rssi_dbm: Option<i8>) {
        self.send(PhyEvent::EnergyScanDone { rssi_dbm });
    }

    fn transmit_started(&mut self, frame: &RadioFrame) {
        self.send(PhyEvent::TransmitStarted {
            frame: frame.clone(),
        });
    }

    fn diag_transmit_done(&mut self, frame: &RadioFrame, result: Result<(), PhyError>) {
        self.send(PhyEvent::DiagTransmitDone {
            frame: frame.clone(),
            result,
        });
    }

    fn diag_receive_done(&mut self, frame: &RadioFrame, result: Result<(), PhyError>) {
        self.send(PhyEvent::DiagReceiveDone {
            frame: frame.clone(),
            result,
        });
    }
}

/// Call `process()` each time `wake` is notified, until `shutdown` turns
/// true or its sender is dropped. Returns the callbacks.
pub async fn run_poll_loop<E, C>(
    phy: Arc<Mutex<PhyDriver<E>>>,
    mut callbacks: C,
    wake: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
) -> C
where
    E: RadioEngine,
    C: PhyCallbacks,
{
    log::debug!("Poll loop started");
    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = wake.notified() => {
                // process() re-signals while it still finds work
                phy.lock().await.process(&mut callbacks);
            }
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    log::debug!("Poll loop stopped");
    callbacks
}

/// A poll loop running on the tokio runtime
pub struct PollLoopHandle<C> {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<C>,
}

impl<C> PollLoopHandle<C> {
    /// Stop the loop and get the callbacks back
    pub async fn stop(self) -> Result<C, JoinError> {
        let _ = self.shutdown.send(true);
        self.task.await
    }
}

/// Spawn [`run_poll_loop`] on the current runtime
pub fn spawn_poll_loop<E, C>(
    phy: Arc<Mutex<PhyDriver<E>>>,
    callbacks: C,
    wake: Arc<Notify>,
) -> PollLoopHandle<C>
where
    E: RadioEngine + Send + 'static,
    C: PhyCallbacks + Send + 'static,
{
    let (shutdown, shutdown_rx) = watch::channel(false);
    // Catch up on events raised before the loop existed
    wake.notify_one();
    let task = tokio::spawn(run_poll_loop(phy, callbacks, wake, shutdown_rx));
    PollLoopHandle { shutdown, task }
}
