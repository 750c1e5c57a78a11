//! # Radio Engine Abstraction
//!
//! The driver talks to the transceiver through two traits that mirror the two
//! execution contexts:
//!
//! - [`RadioEngine`]: commands issued from poll context (entry points and
//!   `process()`). The driver owns the engine.
//! - [`EngineCallbackContext`]: the narrow set of operations the engine allows
//!   from inside its event callback. The engine hands one of these to
//!   [`EventDispatcher::handle_events`](crate::radio::events::EventDispatcher::handle_events)
//!   together with the event mask.
//!
//! ```text
//! ┌─────────────────────────────────┐
//! │        Upper MAC layer          │
//! ├─────────────────────────────────┤
//! │   PhyDriver  /  EventDispatcher │
//! ├─────────────────────────────────┤
//! │ RadioEngine / CallbackContext   │
//! ├─────────────────────────────────┤
//! │  Transceiver (or simulation)    │
//! └─────────────────────────────────┘
//! ```

use crate::config::{CsmaConfig, RadioTimings};
use crate::constants::EXT_ADDRESS_SIZE;
use crate::error::EngineError;
use crate::radio::band::ChannelPlan;
use crate::radio::events::RadioEvents;
use bitflags::bitflags;

/// Opaque handle to a receive packet held inside the engine
pub type RxPacketHandle = u32;

/// IEEE 802.15.4 extended address, least significant byte first
pub type ExtAddress = [u8; EXT_ADDRESS_SIZE];

/// Source address of a received MAC command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacAddress {
    Short(u16),
    Extended(ExtAddress),
}

/// How the engine should stop current activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleMode {
    /// Finish the current operation, then idle
    Idle,
    /// Abort any frame under transmission or reception
    Abort,
}

/// Completion status of a held receive packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxPacketStatus {
    /// Packet fully received with good CRC
    ReadySuccess,
    /// Packet received, CRC check failed
    ReadyCrcError,
    /// Reception aborted
    Aborted,
    /// Handle does not refer to a packet
    Invalid,
}

/// Size information of a held receive packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxPacketInfo {
    pub status: RxPacketStatus,
    /// Bytes stored for this packet, including the PHY length octet and
    /// excluding the stripped FCS
    pub packet_bytes: u16,
}

/// Per-packet radio measurements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxPacketDetails {
    /// Hardware matched this packet as an ACK to our last transmission
    pub is_ack: bool,
    pub rssi_dbm: i8,
    pub lqi: u8,
    pub time_us: u32,
}

/// PA selection applied together with a band configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPowerMode {
    TwoPointFourHighPower,
    TwoPointFourLowPower,
    SubGig,
}

/// PA configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxPowerConfig {
    pub mode: TxPowerMode,
    pub voltage_mv: u16,
    pub ramp_time_us: u16,
}

bitflags! {
    /// Per-transmission options
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TxOptions: u8 {
        /// Keep the receiver on after TX and wait for an ACK
        const WAIT_FOR_ACK = 0b0000_0001;
    }
}

/// Commands available from poll context
pub trait RadioEngine {
    /// Configure IEEE 802.15.4 mode with hardware auto-ACK
    fn configure_ieee802154(
        &mut self,
        ack_timeout_us: u16,
        timings: &RadioTimings,
    ) -> Result<(), EngineError>;

    /// Select which events are delivered to the callback
    fn configure_events(&mut self, events: RadioEvents) -> Result<(), EngineError>;

    /// Stop radio activity
    fn idle(&mut self, mode: IdleMode);

    /// Load a sub-GHz channel plan, returning the first channel it defines
    fn config_channels(&mut self, plan: &ChannelPlan) -> Result<u16, EngineError>;

    /// Load the built-in 2.4 GHz O-QPSK PHY
    fn config_2p4ghz_radio(&mut self) -> Result<(), EngineError>;

    /// Select PA and supply for the loaded band
    fn config_tx_power(&mut self, config: &TxPowerConfig) -> Result<(), EngineError>;

    /// Set output power in deci-dBm
    fn set_tx_power_deci_dbm(&mut self, power: i16) -> Result<(), EngineError>;

    /// Enter receive on `channel`
    fn start_rx(&mut self, channel: u8) -> Result<(), EngineError>;

    /// Append to the transmit FIFO, optionally resetting it first
    fn write_tx_fifo(&mut self, data: &[u8], reset: bool) -> Result<usize, EngineError>;

    /// Transmit the FIFO contents immediately
    fn start_tx(&mut self, channel: u8, options: TxOptions) -> Result<(), EngineError>;

    /// Transmit the FIFO contents after CSMA-CA
    fn start_cca_csma_tx(
        &mut self,
        channel: u8,
        options: TxOptions,
        csma: &CsmaConfig,
    ) -> Result<(), EngineError>;

    /// Status and size of a held packet
    fn rx_packet_info(&mut self, handle: RxPacketHandle) -> RxPacketInfo;

    /// RSSI/LQI/ACK flag of a held packet
    fn rx_packet_details(&mut self, handle: RxPacketHandle)
        -> Result<RxPacketDetails, EngineError>;

    /// Copy a held packet (length octet first) into `dst`, returning bytes copied
    fn copy_rx_packet(&mut self, handle: RxPacketHandle, dst: &mut [u8]) -> usize;

    /// Return a held packet's storage to the engine
    fn release_rx_packet(&mut self, handle: RxPacketHandle) -> Result<(), EngineError>;

    /// Begin RSSI averaging; completion is reported with `RSSI_AVERAGE_DONE`
    fn start_average_rssi(&mut self, channel: u8, averaging_time_us: u32)
        -> Result<(), EngineError>;

    /// The receiver is currently on
    fn is_receiving(&self) -> bool;

    /// Instantaneous RSSI in quarter-dBm, if valid
    fn rssi_quarter_dbm(&mut self) -> Option<i16>;

    fn set_pan_id(&mut self, pan_id: u16) -> Result<(), EngineError>;

    fn set_short_address(&mut self, address: u16) -> Result<(), EngineError>;

    fn set_extended_address(&mut self, address: &ExtAddress) -> Result<(), EngineError>;

    /// Disable hardware address filtering
    fn set_promiscuous(&mut self, enable: bool) -> Result<(), EngineError>;

    /// Factory-programmed unique identifier
    fn unique_id(&self) -> u64;
}

/// Operations permitted from inside the engine event callback.
///
/// Implementations must not block.
pub trait EngineCallbackContext {
    /// Source address of the data request command being acknowledged
    fn data_request_source(&mut self) -> Option<MacAddress>;

    /// Set frame-pending in the ACK currently being built
    fn set_frame_pending(&mut self) -> Result<(), EngineError>;

    /// Keep the just-received packet in engine storage, returning its handle
    fn hold_rx_packet(&mut self) -> Option<RxPacketHandle>;

    /// Run every pending calibration
    fn calibrate_pending(&mut self) -> Result<(), EngineError>;

    /// Result of the finished RSSI averaging, in quarter-dBm
    fn average_rssi_quarter_dbm(&mut self) -> Option<i16>;
}
