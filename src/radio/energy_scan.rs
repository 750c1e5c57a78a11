//! Energy scan controller.
//!
//! One scan at a time: `Idle → InProgress → Completed → Idle`. The callback
//! context only fills the result slot in [`CallbackShared`]; this controller
//! observes it from `process()` and moves the status along.

use crate::error::PhyError;
use crate::radio::events::CallbackShared;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyScanStatus {
    Idle,
    InProgress,
    Completed,
}

/// How the result is handed back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyScanMode {
    /// `process()` upcalls `energy_scan_done`
    Async,
    /// The caller polls `take_energy_scan_result`
    Sync,
}

#[derive(Debug)]
pub struct EnergyScanController {
    status: EnergyScanStatus,
    mode: EnergyScanMode,
    result_dbm: Option<i8>,
}

impl Default for EnergyScanController {
    fn default() -> Self {
        Self::new()
    }
}

impl EnergyScanController {
    pub fn new() -> Self {
        Self {
            status: EnergyScanStatus::Idle,
            mode: EnergyScanMode::Async,
            result_dbm: None,
        }
    }

    pub fn status(&self) -> EnergyScanStatus {
        self.status
    }

    pub fn mode(&self) -> EnergyScanMode {
        self.mode
    }

    /// A new scan may start
    pub fn ensure_idle(&self) -> Result<(), PhyError> {
        match self.status {
            EnergyScanStatus::Idle => Ok(()),
            _ => Err(PhyError::Busy),
        }
    }

    /// Record that the engine accepted a scan request
    pub fn begin(&mut self, mode: EnergyScanMode, shared: &CallbackShared) {
        // A result left over from a cancelled scan must not complete this one
        let _ = shared.take_scan_result();
        self.status = EnergyScanStatus::InProgress;
        self.mode = mode;
        self.result_dbm = None;
    }

    /// Move to Completed once callback context has filled the result slot
    pub fn poll(&mut self, shared: &CallbackShared) -> bool {
        if self.status != EnergyScanStatus::InProgress {
            return false;
        }
        match shared.take_scan_result() {
            Some(result) => {
                self.result_dbm = result;
                self.status = EnergyScanStatus::Completed;
                true
            }
            None => false,
        }
    }

    /// Drain a completed scan exactly once, returning to Idle.
    ///
    /// The outer `Option` is "a result was available", the inner one is the
    /// dBm reading or invalid.
    pub fn take_result(&mut self) -> Option<Option<i8>> {
        if self.status != EnergyScanStatus::Completed {
            return None;
        }
        self.status = EnergyScanStatus::Idle;
        Some(self.result_dbm.take())
    }

    /// Abandon any scan
    pub fn reset(&mut self, shared: &CallbackShared) {
        let _ = shared.take_scan_result();
        self.status = EnergyScanStatus::Idle;
        self.result_dbm = None;
    }
}
