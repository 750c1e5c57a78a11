//! Driver statistics.
//!
//! Poll-side counters live in [`PhyStats`] directly; callback-side counters
//! are merged in from [`CallbackCounters`] when a snapshot is taken.

use crate::radio::events::CallbackCounters;
use crate::radio::receive::RxDropReason;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhyStats {
    // Transmit
    pub tx_started: u32,
    pub tx_success: u32,
    pub tx_no_ack: u32,
    pub tx_channel_access_failure: u32,
    pub tx_abort: u32,
    pub acks_matched: u32,

    // Receive
    pub rx_delivered: u32,
    pub rx_dropped_not_ready: u32,
    pub rx_dropped_length: u32,
    pub rx_dropped_malformed_ack: u32,
    pub rx_dropped_unexpected_ack: u32,
    pub rx_dropped_ack_length_data: u32,
    pub rx_ring_overflows: u32,
    pub rx_hold_failures: u32,

    // Radio
    pub band_reloads: u32,
    pub energy_scans: u32,
    pub calibrations: u32,
    pub calibration_failures: u32,
    pub frame_pending_set: u32,
}

impl PhyStats {
    pub(crate) fn record_drop(&mut self, reason: RxDropReason) {
        let counter = match reason {
            RxDropReason::NotReady | RxDropReason::DetailsUnavailable => {
                &mut self.rx_dropped_not_ready
            }
            RxDropReason::LengthMismatch | RxDropReason::BadLength => &mut self.rx_dropped_length,
            RxDropReason::MalformedAck => &mut self.rx_dropped_malformed_ack,
            RxDropReason::UnexpectedAck => &mut self.rx_dropped_unexpected_ack,
            RxDropReason::AckLengthData => &mut self.rx_dropped_ack_length_data,
        };
        *counter = counter.wrapping_add(1);
    }

    pub(crate) fn merge_callback(&mut self, counters: CallbackCounters) {
        self.calibrations = counters.calibrations;
        self.calibration_failures = counters.calibration_failures;
        self.rx_ring_overflows = counters.rx_ring_overflows;
        self.rx_hold_failures = counters.rx_hold_failures;
        self.frame_pending_set = counters.frame_pending_set;
    }

    /// Frames dropped for any reason
    pub fn rx_dropped(&self) -> u32 {
        self.rx_dropped_not_ready
            + self.rx_dropped_length
            + self.rx_dropped_malformed_ack
            + self.rx_dropped_unexpected_ack
            + self.rx_dropped_ack_length_data
            + self.rx_ring_overflows
    }
}
