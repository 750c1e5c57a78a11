//! # Receive Pipeline
//!
//! Turns one held engine packet into either a frame for the upper layer, an
//! ACK for the transmit pipeline, or a silent drop. The packet handle is
//! released on every path.
//!
//! Engine packet layout: `[phy_length, psdu[..phy_length - 2]]`. The FCS is
//! checked and stripped by the hardware, so `packet_bytes == phy_length - 1`.

use crate::constants::*;
use crate::radio::engine::{RadioEngine, RxPacketHandle, RxPacketStatus};
use crate::radio::frame::{is_valid_psdu_length, RadioFrame};
use crate::radio::transmit::TransmitPipeline;
use crate::util::logging::{log_frame_hex, LogThrottle};

/// Why a received packet never reached the upper layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxDropReason {
    /// Engine reports the packet incomplete, aborted or failing CRC
    NotReady,
    /// Engine could not provide RSSI/LQI details
    DetailsUnavailable,
    /// Length octet disagrees with the stored byte count
    LengthMismatch,
    /// PHY length outside [5, 127]
    BadLength,
    /// Flagged as ACK but not a 5-octet ACK frame
    MalformedAck,
    /// ACK with no transmission waiting for it
    UnexpectedAck,
    /// 5-octet data frame outside promiscuous mode
    AckLengthData,
}

/// Result of processing one packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxDisposition {
    /// Receive frame holds a data frame for the upper layer
    Deliver,
    /// An ACK resolved the in-flight transmission
    AckResolved,
    Dropped(RxDropReason),
}

#[derive(Debug)]
pub struct ReceivePipeline {
    frame: RadioFrame,
    promiscuous: bool,
    drop_log: LogThrottle,
}

impl Default for ReceivePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceivePipeline {
    pub fn new() -> Self {
        Self {
            frame: RadioFrame::new(),
            promiscuous: false,
            // 5 drop warnings per second
            drop_log: LogThrottle::new(1000, 5),
        }
    }

    pub fn frame(&self) -> &RadioFrame {
        &self.frame
    }

    /// Channel stamped on received frames
    pub fn set_channel(&mut self, channel: u8) {
        self.frame.channel = channel;
    }

    pub fn promiscuous(&self) -> bool {
        self.promiscuous
    }

    pub fn set_promiscuous(&mut self, enable: bool) {
        self.promiscuous = enable;
    }

    /// Classify the packet behind `handle`, then release it
    pub fn process_packet<E: RadioEngine>(
        &mut self,
        engine: &mut E,
        handle: RxPacketHandle,
        tx: &mut TransmitPipeline,
    ) -> RxDisposition {
        let disposition = self.classify(engine, handle, tx);

        if let Err(e) = engine.release_rx_packet(handle) {
            log::warn!("Failed to release RX packet {handle}: {e}");
        }

        if let RxDisposition::Dropped(reason) = disposition {
            crate::log_warn_throttled!(self.drop_log, "Dropped RX packet {handle}: {reason:?}");
        }
        disposition
    }

    fn classify<E: RadioEngine>(
        &mut self,
        engine: &mut E,
        handle: RxPacketHandle,
        tx: &mut TransmitPipeline,
    ) -> RxDisposition {
        use RxDisposition::Dropped;

        let info = engine.rx_packet_info(handle);
        if info.status != RxPacketStatus::ReadySuccess {
            return Dropped(RxDropReason::NotReady);
        }

        let details = match engine.rx_packet_details(handle) {
            Ok(details) => details,
            Err(_) => return Dropped(RxDropReason::DetailsUnavailable),
        };

        let length = usize::from(info.packet_bytes) + 1;

        let mut raw = [0u8; IEEE802154_MAX_LENGTH + 1];
        let copied = engine.copy_rx_packet(handle, &mut raw);
        // Length octet plus the PSDU without its FCS
        if copied != length - 1 || usize::from(raw[0]) != length {
            return Dropped(RxDropReason::LengthMismatch);
        }

        if !is_valid_psdu_length(length) {
            return Dropped(RxDropReason::BadLength);
        }

        // Skip the length octet
        let body = &raw[1..copied];
        self.frame.psdu_mut()[..body.len()].copy_from_slice(body);
        self.frame.set_length(length);

        if details.is_ack {
            if !self.frame.is_ack() {
                return Dropped(RxDropReason::MalformedAck);
            }
            log::debug!("RX ACK seq={}", self.frame.sequence());
            return if tx.resolve_ack(&self.frame) {
                RxDisposition::AckResolved
            } else {
                Dropped(RxDropReason::UnexpectedAck)
            };
        }

        if length == IEEE802154_ACK_LENGTH && !self.promiscuous {
            return Dropped(RxDropReason::AckLengthData);
        }

        self.frame.rx_info.rssi_dbm = details.rssi_dbm;
        self.frame.rx_info.lqi = details.lqi;
        self.frame.rx_info.timestamp_us = details.time_us;
        // The engine does not report which ACKs carried frame-pending
        self.frame.rx_info.acked_with_frame_pending = true;

        log::info!("Received {} bytes", length);
        log_frame_hex("RX PSDU", self.frame.payload());
        RxDisposition::Deliver
    }
}
