//! # Radio Event Dispatch
//!
//! [`EventDispatcher::handle_events`] runs in the radio engine's callback
//! context (interrupt priority). It only records facts for `process()`:
//!
//! | Event                  | Recorded as                                   |
//! |------------------------|-----------------------------------------------|
//! | DATA_REQUEST_COMMAND   | frame-pending set on the outgoing ACK          |
//! | TX completion          | [`TxOutcome`] in the outcome slot              |
//! | RX_ACK_TIMEOUT         | `TxOutcome::NoAck`                             |
//! | RX_PACKET_RECEIVED     | packet handle pushed on the receive ring       |
//! | CAL_NEEDED             | calibration run inline                         |
//! | RSSI_AVERAGE_DONE      | dBm result in the scan slot                    |
//!
//! Every slot in [`CallbackShared`] has exactly one writer side and one reader
//! side. Nothing here logs, allocates or blocks; problems are counted and
//! reported by the poll side.

use crate::constants::{QUARTER_DBM_IN_DBM, RSSI_INVALID};
use crate::error::PhyError;
use crate::radio::engine::{EngineCallbackContext, MacAddress};
use crate::radio::rx_ring::RxHandleRing;
use crate::radio::source_match::SourceMatchTable;
use crate::radio::wake::WakeSignal;
use bitflags::bitflags;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

bitflags! {
    /// Event mask delivered by the radio engine
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RadioEvents: u32 {
        /// A MAC data request command is being acknowledged
        const DATA_REQUEST_COMMAND = 1 << 0;
        /// Transmission finished
        const TX_PACKET_SENT = 1 << 1;
        /// CSMA-CA gave up
        const TX_CHANNEL_BUSY = 1 << 2;
        /// Transmission aborted
        const TX_ABORTED = 1 << 3;
        /// Transmission blocked by the scheduler
        const TX_BLOCKED = 1 << 4;
        /// Transmit FIFO ran dry mid-frame
        const TX_UNDERFLOW = 1 << 5;
        /// No ACK within the ACK timeout
        const RX_ACK_TIMEOUT = 1 << 6;
        /// A packet is ready in engine storage
        const RX_PACKET_RECEIVED = 1 << 7;
        /// Calibration must run now
        const CAL_NEEDED = 1 << 8;
        /// RSSI averaging finished
        const RSSI_AVERAGE_DONE = 1 << 9;

        /// Any transmit completion
        const TX_COMPLETION = Self::TX_PACKET_SENT.bits()
            | Self::TX_CHANNEL_BUSY.bits()
            | Self::TX_ABORTED.bits()
            | Self::TX_BLOCKED.bits()
            | Self::TX_UNDERFLOW.bits();
    }
}

impl RadioEvents {
    /// Events the driver subscribes to at init
    pub fn driver_mask() -> Self {
        Self::RX_ACK_TIMEOUT
            | Self::TX_COMPLETION
            | Self::RX_PACKET_RECEIVED
            | Self::RSSI_AVERAGE_DONE
            | Self::DATA_REQUEST_COMMAND
            | Self::CAL_NEEDED
    }
}

/// Transmit result recorded in callback context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TxOutcome {
    /// Sent, no ACK requested
    Sent = 1,
    /// CSMA-CA failed
    ChannelBusy = 2,
    /// Aborted, blocked or underflowed
    Aborted = 3,
    /// ACK timeout
    NoAck = 4,
}

impl TxOutcome {
    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(TxOutcome::Sent),
            2 => Some(TxOutcome::ChannelBusy),
            3 => Some(TxOutcome::Aborted),
            4 => Some(TxOutcome::NoAck),
            _ => None,
        }
    }

    /// Completion result published to the upper layer
    pub fn into_result(self) -> Result<(), PhyError> {
        match self {
            TxOutcome::Sent => Ok(()),
            TxOutcome::ChannelBusy => Err(PhyError::ChannelAccessFailure),
            TxOutcome::Aborted => Err(PhyError::Abort),
            TxOutcome::NoAck => Err(PhyError::NoAck),
        }
    }
}

const TX_OUTCOME_NONE: u8 = 0;
const SCAN_SLOT_EMPTY: u16 = 0;
const SCAN_SLOT_DONE: u16 = 1 << 8;

/// Snapshot of the callback-side counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallbackCounters {
    pub calibrations: u32,
    pub calibration_failures: u32,
    pub rx_ring_overflows: u32,
    pub rx_hold_failures: u32,
    pub frame_pending_set: u32,
}

/// State shared between callback context and poll context
#[derive(Debug)]
pub struct CallbackShared {
    /// Written by callback, taken by poll
    tx_outcome: AtomicU8,
    /// Written by poll before a transmission, read by callback
    tx_ack_requested: AtomicBool,
    /// Written by poll, read by callback
    source_match_enabled: AtomicBool,
    /// Written by callback (done flag | dBm), taken by poll
    scan_slot: AtomicU16,
    /// Produced by callback, consumed by poll
    rx_ring: RxHandleRing,

    // Written by callback only
    calibrations: AtomicU32,
    calibration_failures: AtomicU32,
    rx_ring_overflows: AtomicU32,
    rx_hold_failures: AtomicU32,
    frame_pending_set: AtomicU32,
}

impl CallbackShared {
    pub fn new(rx_ring_capacity: usize) -> Self {
        Self {
            tx_outcome: AtomicU8::new(TX_OUTCOME_NONE),
            tx_ack_requested: AtomicBool::new(false),
            source_match_enabled: AtomicBool::new(false),
            scan_slot: AtomicU16::new(SCAN_SLOT_EMPTY),
            rx_ring: RxHandleRing::new(rx_ring_capacity),
            calibrations: AtomicU32::new(0),
            calibration_failures: AtomicU32::new(0),
            rx_ring_overflows: AtomicU32::new(0),
            rx_hold_failures: AtomicU32::new(0),
            frame_pending_set: AtomicU32::new(0),
        }
    }

    // ---- poll side ----

    /// Take the recorded transmit outcome, if any
    pub fn take_tx_outcome(&self) -> Option<TxOutcome> {
        TxOutcome::from_raw(self.tx_outcome.swap(TX_OUTCOME_NONE, Ordering::AcqRel))
    }

    /// Publish whether the frame about to be sent requests an ACK
    pub fn set_tx_ack_requested(&self, requested: bool) {
        self.tx_ack_requested.store(requested, Ordering::Release);
    }

    pub fn set_source_match_enabled(&self, enabled: bool) {
        self.source_match_enabled.store(enabled, Ordering::Release);
    }

    pub fn source_match_enabled(&self) -> bool {
        self.source_match_enabled.load(Ordering::Acquire)
    }

    /// Take a completed scan result. `Some(None)` is a completed scan with an
    /// invalid reading.
    pub fn take_scan_result(&self) -> Option<Option<i8>> {
        let raw = self.scan_slot.swap(SCAN_SLOT_EMPTY, Ordering::AcqRel);
        if raw & SCAN_SLOT_DONE == 0 {
            return None;
        }
        let dbm = (raw & 0xff) as u8 as i8;
        Some((dbm != RSSI_INVALID).then_some(dbm))
    }

    /// Oldest held receive packet
    pub fn pop_rx_handle(&self) -> Option<u32> {
        self.rx_ring.pop()
    }

    pub fn rx_pending(&self) -> usize {
        self.rx_ring.len()
    }

    pub fn counters(&self) -> CallbackCounters {
        CallbackCounters {
            calibrations: self.calibrations.load(Ordering::Relaxed),
            calibration_failures: self.calibration_failures.load(Ordering::Relaxed),
            rx_ring_overflows: self.rx_ring_overflows.load(Ordering::Relaxed),
            rx_hold_failures: self.rx_hold_failures.load(Ordering::Relaxed),
            frame_pending_set: self.frame_pending_set.load(Ordering::Relaxed),
        }
    }

    // ---- callback side ----

    fn record_tx_outcome(&self, outcome: TxOutcome) {
        self.tx_outcome.store(outcome as u8, Ordering::Release);
    }

    fn record_scan_result(&self, quarter_dbm: Option<i16>) {
        let dbm = match quarter_dbm {
            Some(q) => {
                (q / QUARTER_DBM_IN_DBM).clamp(i8::MIN as i16, (RSSI_INVALID - 1) as i16) as i8
            }
            None => RSSI_INVALID,
        };
        self.scan_slot
            .store(SCAN_SLOT_DONE | u16::from(dbm as u8), Ordering::Release);
    }
}

/// Callback-context half of the driver.
///
/// Cheap to clone; every clone records into the same [`CallbackShared`].
#[derive(Clone)]
pub struct EventDispatcher {
    shared: Arc<CallbackShared>,
    source_match: Arc<dyn SourceMatchTable>,
    wake: Arc<dyn WakeSignal>,
}

impl EventDispatcher {
    pub fn new(
        shared: Arc<CallbackShared>,
        source_match: Arc<dyn SourceMatchTable>,
        wake: Arc<dyn WakeSignal>,
    ) -> Self {
        Self {
            shared,
            source_match,
            wake,
        }
    }

    /// Record `events` and wake the host.
    ///
    /// Must be called from the engine's callback with the context that
    /// callback provides.
    pub fn handle_events<C: EngineCallbackContext + ?Sized>(
        &self,
        ctx: &mut C,
        events: RadioEvents,
    ) {
        if events.contains(RadioEvents::DATA_REQUEST_COMMAND) {
            self.handle_data_request(ctx);
        }

        if events.intersects(RadioEvents::TX_COMPLETION) {
            if events.contains(RadioEvents::TX_PACKET_SENT) {
                // With an ACK requested, completion comes from the ACK or its timeout
                if !self.shared.tx_ack_requested.load(Ordering::Acquire) {
                    self.shared.record_tx_outcome(TxOutcome::Sent);
                }
            } else if events.contains(RadioEvents::TX_CHANNEL_BUSY) {
                self.shared.record_tx_outcome(TxOutcome::ChannelBusy);
            } else {
                self.shared.record_tx_outcome(TxOutcome::Aborted);
            }
        }

        if events.contains(RadioEvents::RX_ACK_TIMEOUT) {
            self.shared.record_tx_outcome(TxOutcome::NoAck);
        }

        if events.contains(RadioEvents::RX_PACKET_RECEIVED) {
            self.handle_rx_packet(ctx);
        }

        if events.contains(RadioEvents::CAL_NEEDED) {
            match ctx.calibrate_pending() {
                Ok(()) => self.shared.calibrations.fetch_add(1, Ordering::Relaxed),
                Err(_) => self.shared.calibration_failures.fetch_add(1, Ordering::Relaxed),
            };
        }

        if events.contains(RadioEvents::RSSI_AVERAGE_DONE) {
            let quarter_dbm = ctx.average_rssi_quarter_dbm();
            self.shared.record_scan_result(quarter_dbm);
        }

        self.wake.signal();
    }

    fn handle_data_request<C: EngineCallbackContext + ?Sized>(&self, ctx: &mut C) {
        if self.shared.source_match_enabled() {
            let pending = match ctx.data_request_source() {
                Some(MacAddress::Short(address)) => self.source_match.find_short(address),
                Some(MacAddress::Extended(address)) => self.source_match.find_extended(&address),
                None => false,
            };
            if !pending {
                return;
            }
        }

        if ctx.set_frame_pending().is_ok() {
            self.shared.frame_pending_set.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn handle_rx_packet<C: EngineCallbackContext + ?Sized>(&self, ctx: &mut C) {
        // Not holding leaves the packet to the engine, which recycles it
        if self.shared.rx_ring.is_full() {
            self.shared.rx_ring_overflows.fetch_add(1, Ordering::Relaxed);
            return;
        }
        match ctx.hold_rx_packet() {
            Some(handle) => {
                self.shared.rx_ring.push(handle);
            }
            None => {
                self.shared.rx_hold_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
