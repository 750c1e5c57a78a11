//! # Transmit Pipeline
//!
//! Owns the transmit frame and the bookkeeping of the single in-flight
//! transmission. Lifecycle of one transmission:
//!
//! 1. [`TransmitPipeline::start`]: frame written to the FIFO as
//!    `[length, psdu[..length - 2]]`, CSMA-CA or plain transmission started,
//!    `busy` set.
//! 2. Completion arrives either from callback context as a [`TxOutcome`]
//!    ([`TransmitPipeline::absorb`]) or, for ACK-requesting frames, as a
//!    received ACK ([`TransmitPipeline::resolve_ack`]).
//! 3. [`TransmitPipeline::take_completion`] hands the finished transmission to
//!    `process()` exactly once.
//!
//! All state here is poll-context only; the callback side sees nothing but
//! the ACK-requested flag published through [`CallbackShared`].

use crate::config::CsmaConfig;
use crate::error::{EngineError, PhyError};
use crate::radio::engine::{RadioEngine, TxOptions};
use crate::radio::events::{CallbackShared, TxOutcome};
use crate::radio::frame::RadioFrame;

/// A finished transmission ready to be published
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxCompletion {
    pub result: Result<(), PhyError>,
    /// A matching ACK is stored in the ACK frame
    pub ack_matched: bool,
}

#[derive(Debug)]
pub struct TransmitPipeline {
    frame: RadioFrame,
    ack_frame: RadioFrame,
    /// A transmission exists that has not been published yet
    active: bool,
    /// Waiting on hardware completion or ACK
    busy: bool,
    /// Hardware accepted the transmission; `transmit_started` not yet published
    started_pending: bool,
    ack_requested: bool,
    expected_sequence: u8,
    result: Result<(), PhyError>,
    ack_matched: bool,
}

impl Default for TransmitPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl TransmitPipeline {
    pub fn new() -> Self {
        Self {
            frame: RadioFrame::new(),
            ack_frame: RadioFrame::new(),
            active: false,
            busy: false,
            started_pending: false,
            ack_requested: false,
            expected_sequence: 0,
            result: Ok(()),
            ack_matched: false,
        }
    }

    pub fn frame(&self) -> &RadioFrame {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut RadioFrame {
        &mut self.frame
    }

    pub fn ack_frame(&self) -> &RadioFrame {
        &self.ack_frame
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// A transmission awaits publication
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The in-flight transmission is waiting for an ACK
    pub fn awaiting_ack(&self) -> bool {
        self.busy && self.ack_requested
    }

    /// Reject frames outside the PHY length bounds before any hardware write
    pub fn validate(&self) -> Result<(), PhyError> {
        if self.frame.has_valid_length() {
            Ok(())
        } else {
            Err(PhyError::InvalidArgs)
        }
    }

    /// Write the frame to the FIFO and start the transmission.
    ///
    /// An engine rejection is not returned: it completes the transmission with
    /// `ChannelAccessFailure`, published by the next `process()`.
    pub fn start<E: RadioEngine>(
        &mut self,
        engine: &mut E,
        shared: &CallbackShared,
        csma: &CsmaConfig,
    ) {
        let length = self.frame.length();
        let ack_requested = self.frame.ack_requested();
        let channel = self.frame.channel;

        self.active = true;
        self.busy = true;
        self.started_pending = false;
        self.ack_requested = ack_requested;
        self.expected_sequence = self.frame.sequence();
        self.result = Ok(());
        self.ack_matched = false;

        // Stale outcome from an earlier transmission must not complete this one
        let _ = shared.take_tx_outcome();
        shared.set_tx_ack_requested(ack_requested);

        let mut options = TxOptions::empty();
        if ack_requested {
            options |= TxOptions::WAIT_FOR_ACK;
        }

        match self.write_and_start(engine, options, csma) {
            Ok(()) => {
                self.started_pending = true;
                log::debug!(
                    "TX started: channel={} len={} seq={} ack={} csma={}",
                    channel,
                    length,
                    self.expected_sequence,
                    ack_requested,
                    self.frame.tx_info.csma_ca_enabled
                );
            }
            Err(e) => {
                log::warn!("TX start rejected: {e}");
                self.finish(Err(PhyError::ChannelAccessFailure));
            }
        }
    }

    /// Fold a callback-context outcome into the in-flight transmission.
    ///
    /// Outcomes arriving when nothing is in flight are stale and ignored.
    pub fn absorb(&mut self, outcome: TxOutcome) -> bool {
        if !self.busy {
            log::debug!("Ignoring stale TX outcome {outcome:?}");
            return false;
        }
        self.finish(outcome.into_result());
        true
    }

    /// Match a received ACK against the in-flight transmission.
    ///
    /// Returns `false` when no transmission waits for an ACK; the ACK is then
    /// dropped by the caller.
    pub fn resolve_ack(&mut self, ack: &RadioFrame) -> bool {
        if !self.awaiting_ack() {
            return false;
        }

        if ack.sequence() == self.expected_sequence {
            self.ack_frame.clone_from(ack);
            self.ack_matched = true;
            self.finish(Ok(()));
        } else {
            log::debug!(
                "ACK sequence mismatch: expected {} got {}",
                self.expected_sequence,
                ack.sequence()
            );
            self.finish(Err(PhyError::NoAck));
        }
        true
    }

    /// Take the `transmit_started` notification, once per accepted transmission
    pub fn take_started(&mut self) -> bool {
        std::mem::take(&mut self.started_pending)
    }

    /// Take the finished transmission, once
    pub fn take_completion(&mut self) -> Option<TxCompletion> {
        if !self.active || self.busy {
            return None;
        }
        self.active = false;
        self.started_pending = false;
        Some(TxCompletion {
            result: self.result,
            ack_matched: self.ack_matched && self.ack_requested && self.result.is_ok(),
        })
    }

    /// Drop any in-flight or unpublished transmission
    pub fn reset(&mut self, shared: &CallbackShared) {
        self.active = false;
        self.busy = false;
        self.started_pending = false;
        self.ack_matched = false;
        self.result = Ok(());
        shared.set_tx_ack_requested(false);
        let _ = shared.take_tx_outcome();
    }

    fn write_and_start<E: RadioEngine>(
        &self,
        engine: &mut E,
        options: TxOptions,
        csma: &CsmaConfig,
    ) -> Result<(), EngineError> {
        engine.write_tx_fifo(&[self.frame.length() as u8], true)?;
        engine.write_tx_fifo(self.frame.payload(), false)?;
        if self.frame.tx_info.csma_ca_enabled {
            engine.start_cca_csma_tx(self.frame.channel, options, csma)
        } else {
            engine.start_tx(self.frame.channel, options)
        }
    }

    fn finish(&mut self, result: Result<(), PhyError>) {
        self.busy = false;
        self.result = result;
    }
}
