//! # Simulated Radio Engine
//!
//! An in-memory [`RadioEngine`] for tests, benchmarks and the `phy-sim` CLI.
//!
//! [`SimulatedEngine::new`] returns the engine (handed to the driver) and a
//! [`SimRadio`] control handle (kept by the test). The handle plays the role
//! of "the air" and of the engine's interrupt line: injecting a frame stores
//! it as the engine's current receive packet and then invokes the attached
//! [`EventDispatcher`] exactly like a hardware callback would.
//!
//! ```rust,ignore
//! let (engine, radio) = SimulatedEngine::new(0x0102_0304_0506_0708);
//! let mut phy = PhyDriver::new(engine, PhyConfig::default(), table, wake)?;
//! radio.attach(phy.event_dispatcher());
//! radio.inject_frame(&[0x41, 0x88, 0x01, 0xcd, 0xab]);
//! ```
//!
//! Events raised by engine commands (for example `TX_PACKET_SENT` from
//! `start_tx`) are delivered synchronously before the command returns, after
//! the engine's internal lock has been released.

use crate::config::{CsmaConfig, RadioTimings};
use crate::constants::*;
use crate::error::EngineError;
use crate::radio::band::ChannelPlan;
use crate::radio::engine::*;
use crate::radio::events::{EventDispatcher, RadioEvents};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// How the simulated hardware finishes a transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxBehavior {
    /// Frame goes out
    Sent,
    /// CSMA-CA finds the channel busy
    ChannelBusy,
    /// Transmission aborted
    Abort,
    /// `start_tx` itself fails
    Reject,
    /// No completion event at all
    Silent,
}

/// What happens after an ACK-requesting frame was sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckBehavior {
    /// A matching ACK is received
    Auto,
    /// The ACK timeout fires
    Timeout,
    /// Nothing; the test injects the ACK or timeout
    Manual,
}

/// One frame handed to the simulated transmitter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimTransmission {
    pub channel: u8,
    /// PHY length octet as written to the FIFO
    pub phy_length: u8,
    /// MAC octets (FCS excluded)
    pub mac: Vec<u8>,
    pub options: TxOptions,
    pub csma: Option<CsmaConfig>,
}

/// A packet in simulated engine storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimPacket {
    pub status: RxPacketStatus,
    /// Length octet followed by the MAC octets
    pub bytes: Vec<u8>,
    pub details: RxPacketDetails,
    /// Copy at most this many octets out, as an engine that lost the tail
    pub copy_limit: Option<usize>,
}

impl SimPacket {
    /// Well-formed packet for `mac` octets (FCS excluded)
    pub fn from_mac(mac: &[u8], details: RxPacketDetails) -> Self {
        let mut bytes = Vec::with_capacity(mac.len() + 1);
        bytes.push((mac.len() + IEEE802154_FCS_LENGTH) as u8);
        bytes.extend_from_slice(mac);
        Self {
            status: RxPacketStatus::ReadySuccess,
            bytes,
            details,
            copy_limit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadedPhy {
    OqpskTwoPointFour,
    Plan(ChannelPlan),
}

impl LoadedPhy {
    fn supports(&self, channel: u8) -> bool {
        match self {
            LoadedPhy::OqpskTwoPointFour => {
                (CHANNEL_2P4GHZ_MIN..=CHANNEL_2P4GHZ_MAX).contains(&channel)
            }
            LoadedPhy::Plan(plan) => plan.frequency_hz(u16::from(channel)).is_some(),
        }
    }
}

#[derive(Debug)]
struct SimState {
    unique_id: u64,
    ieee_configured: bool,
    ack_timeout_us: u16,
    timings: Option<RadioTimings>,
    event_mask: RadioEvents,

    loaded: Option<LoadedPhy>,
    band_loads: u32,
    tx_power_config: Option<TxPowerConfig>,
    tx_power_deci_dbm: i16,

    receiving: bool,
    channel: u8,
    idle_aborts: u32,

    tx_fifo: Vec<u8>,
    tx_log: Vec<SimTransmission>,
    tx_behavior: TxBehavior,
    ack_behavior: AckBehavior,

    current_rx: Option<SimPacket>,
    held: BTreeMap<RxPacketHandle, SimPacket>,
    next_handle: RxPacketHandle,
    released: u32,
    time_us: u32,

    rssi_quarter_dbm: Option<i16>,
    scan_channel: Option<u8>,
    auto_complete_scan: bool,

    data_request_source: Option<MacAddress>,
    frame_pending_set: bool,
    calibrations: u32,
    calibration_fails: bool,

    pan_id: u16,
    short_address: u16,
    extended_address: ExtAddress,
    promiscuous: bool,
}

impl SimState {
    fn new(unique_id: u64) -> Self {
        Self {
            unique_id,
            ieee_configured: false,
            ack_timeout_us: 0,
            timings: None,
            event_mask: RadioEvents::empty(),
            loaded: None,
            band_loads: 0,
            tx_power_config: None,
            tx_power_deci_dbm: 0,
            receiving: false,
            channel: 0,
            idle_aborts: 0,
            tx_fifo: Vec::with_capacity(IEEE802154_MAX_LENGTH + 1),
            tx_log: Vec::new(),
            tx_behavior: TxBehavior::Sent,
            ack_behavior: AckBehavior::Auto,
            current_rx: None,
            held: BTreeMap::new(),
            next_handle: 1,
            released: 0,
            time_us: 0,
            rssi_quarter_dbm: Some(-90 * QUARTER_DBM_IN_DBM),
            scan_channel: None,
            auto_complete_scan: false,
            data_request_source: None,
            frame_pending_set: false,
            calibrations: 0,
            calibration_fails: false,
            pan_id: 0xffff,
            short_address: 0xfffe,
            extended_address: [0; EXT_ADDRESS_SIZE],
            promiscuous: false,
        }
    }

    fn check_channel(&self, channel: u8) -> Result<(), EngineError> {
        match self.loaded {
            Some(phy) if phy.supports(channel) => Ok(()),
            _ => Err(EngineError::InvalidChannel(channel)),
        }
    }

    /// Make `packet` the engine's current receive packet
    fn arrive(&mut self, mut packet: SimPacket) {
        self.time_us = self.time_us.wrapping_add(1_000);
        packet.details.time_us = self.time_us;
        self.current_rx = Some(packet);
    }

    /// Carry out a transmission from the FIFO, returning the events it raises
    fn transmit(
        &mut self,
        channel: u8,
        options: TxOptions,
        csma: Option<&CsmaConfig>,
    ) -> Result<Vec<RadioEvents>, EngineError> {
        self.check_channel(channel)?;
        if self.tx_behavior == TxBehavior::Reject {
            return Err(EngineError::Rejected("transmit refused"));
        }
        let Some((&phy_length, mac)) = self.tx_fifo.split_first() else {
            return Err(EngineError::Rejected("tx fifo empty"));
        };

        let mac = mac.to_vec();
        let sequence = mac.get(IEEE802154_DSN_OFFSET).copied().unwrap_or(0);
        self.tx_log.push(SimTransmission {
            channel,
            phy_length,
            mac,
            options,
            csma: csma.copied(),
        });
        self.channel = channel;

        let mut events = Vec::new();
        match self.tx_behavior {
            TxBehavior::Sent => {
                events.push(RadioEvents::TX_PACKET_SENT);
                if options.contains(TxOptions::WAIT_FOR_ACK) {
                    match self.ack_behavior {
                        AckBehavior::Auto => {
                            let ack = SimPacket::from_mac(
                                &[IEEE802154_FRAME_TYPE_ACK, 0x00, sequence],
                                RxPacketDetails {
                                    is_ack: true,
                                    rssi_dbm: -40,
                                    lqi: 255,
                                    time_us: 0,
                                },
                            );
                            self.arrive(ack);
                            events.push(RadioEvents::RX_PACKET_RECEIVED);
                        }
                        AckBehavior::Timeout => events.push(RadioEvents::RX_ACK_TIMEOUT),
                        AckBehavior::Manual => {}
                    }
                }
            }
            TxBehavior::ChannelBusy => events.push(RadioEvents::TX_CHANNEL_BUSY),
            TxBehavior::Abort => events.push(RadioEvents::TX_ABORTED),
            TxBehavior::Silent | TxBehavior::Reject => {}
        }

        // Auto-ACK transitions back to receive
        self.receiving = true;
        Ok(events)
    }
}

struct SimShared {
    state: Mutex<SimState>,
    dispatcher: Mutex<Option<EventDispatcher>>,
}

impl SimShared {
    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver `events` through the attached dispatcher, like an interrupt.
    /// Must be called without the state lock held.
    fn raise(&self, events: RadioEvents) {
        let events = events & self.state().event_mask;
        if events.is_empty() {
            return;
        }
        let dispatcher = self
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(dispatcher) = dispatcher {
            dispatcher.handle_events(&mut SimCallbackContext { shared: self }, events);
        }
    }
}

/// Engine view available inside the simulated event callback
struct SimCallbackContext<'a> {
    shared: &'a SimShared,
}

impl EngineCallbackContext for SimCallbackContext<'_> {
    fn data_request_source(&mut self) -> Option<MacAddress> {
        self.shared.state().data_request_source
    }

    fn set_frame_pending(&mut self) -> Result<(), EngineError> {
        self.shared.state().frame_pending_set = true;
        Ok(())
    }

    fn hold_rx_packet(&mut self) -> Option<RxPacketHandle> {
        let mut state = self.shared.state();
        let packet = state.current_rx.take()?;
        let handle = state.next_handle;
        state.next_handle = state.next_handle.wrapping_add(1).max(1);
        state.held.insert(handle, packet);
        Some(handle)
    }

    fn calibrate_pending(&mut self) -> Result<(), EngineError> {
        let mut state = self.shared.state();
        if state.calibration_fails {
            return Err(EngineError::Rejected("calibration failed"));
        }
        state.calibrations += 1;
        Ok(())
    }

    fn average_rssi_quarter_dbm(&mut self) -> Option<i16> {
        let mut state = self.shared.state();
        state.scan_channel.take()?;
        state.rssi_quarter_dbm
    }
}

/// In-memory radio engine
pub struct SimulatedEngine {
    shared: Arc<SimShared>,
}

/// Control handle for a [`SimulatedEngine`]
#[derive(Clone)]
pub struct SimRadio {
    shared: Arc<SimShared>,
}

impl SimulatedEngine {
    /// Create an engine with the given factory unique id
    pub fn new(unique_id: u64) -> (SimulatedEngine, SimRadio) {
        let shared = Arc::new(SimShared {
            state: Mutex::new(SimState::new(unique_id)),
            dispatcher: Mutex::new(None),
        });
        (
            SimulatedEngine {
                shared: shared.clone(),
            },
            SimRadio { shared },
        )
    }

    fn raise_all(&self, events: Vec<RadioEvents>) {
        for event in events {
            self.shared.raise(event);
        }
    }
}

impl RadioEngine for SimulatedEngine {
    fn configure_ieee802154(
        &mut self,
        ack_timeout_us: u16,
        timings: &RadioTimings,
    ) -> Result<(), EngineError> {
        let mut state = self.shared.state();
        state.ieee_configured = true;
        state.ack_timeout_us = ack_timeout_us;
        state.timings = Some(*timings);
        Ok(())
    }

    fn configure_events(&mut self, events: RadioEvents) -> Result<(), EngineError> {
        self.shared.state().event_mask = events;
        Ok(())
    }

    fn idle(&mut self, mode: IdleMode) {
        let mut state = self.shared.state();
        state.receiving = false;
        state.scan_channel = None;
        if mode == IdleMode::Abort {
            state.idle_aborts += 1;
            state.current_rx = None;
        }
    }

    fn config_channels(&mut self, plan: &ChannelPlan) -> Result<u16, EngineError> {
        let mut state = self.shared.state();
        state.loaded = Some(LoadedPhy::Plan(*plan));
        state.band_loads += 1;
        Ok(plan.first_channel)
    }

    fn config_2p4ghz_radio(&mut self) -> Result<(), EngineError> {
        let mut state = self.shared.state();
        state.loaded = Some(LoadedPhy::OqpskTwoPointFour);
        state.band_loads += 1;
        Ok(())
    }

    fn config_tx_power(&mut self, config: &TxPowerConfig) -> Result<(), EngineError> {
        self.shared.state().tx_power_config = Some(*config);
        Ok(())
    }

    fn set_tx_power_deci_dbm(&mut self, power: i16) -> Result<(), EngineError> {
        self.shared.state().tx_power_deci_dbm = power;
        Ok(())
    }

    fn start_rx(&mut self, channel: u8) -> Result<(), EngineError> {
        let mut state = self.shared.state();
        state.check_channel(channel)?;
        state.receiving = true;
        state.channel = channel;
        Ok(())
    }

    fn write_tx_fifo(&mut self, data: &[u8], reset: bool) -> Result<usize, EngineError> {
        let mut state = self.shared.state();
        if reset {
            state.tx_fifo.clear();
        }
        let room = (IEEE802154_MAX_LENGTH + 1).saturating_sub(state.tx_fifo.len());
        let written = data.len().min(room);
        state.tx_fifo.extend_from_slice(&data[..written]);
        Ok(written)
    }

    fn start_tx(&mut self, channel: u8, options: TxOptions) -> Result<(), EngineError> {
        let events = self.shared.state().transmit(channel, options, None)?;
        self.raise_all(events);
        Ok(())
    }

    fn start_cca_csma_tx(
        &mut self,
        channel: u8,
        options: TxOptions,
        csma: &CsmaConfig,
    ) -> Result<(), EngineError> {
        let events = self.shared.state().transmit(channel, options, Some(csma))?;
        self.raise_all(events);
        Ok(())
    }

    fn rx_packet_info(&mut self, handle: RxPacketHandle) -> RxPacketInfo {
        match self.shared.state().held.get(&handle) {
            Some(packet) => RxPacketInfo {
                status: packet.status,
                packet_bytes: packet.bytes.len() as u16,
            },
            None => RxPacketInfo {
                status: RxPacketStatus::Invalid,
                packet_bytes: 0,
            },
        }
    }

    fn rx_packet_details(
        &mut self,
        handle: RxPacketHandle,
    ) -> Result<RxPacketDetails, EngineError> {
        self.shared
            .state()
            .held
            .get(&handle)
            .map(|packet| packet.details)
            .ok_or(EngineError::InvalidHandle(handle))
    }

    fn copy_rx_packet(&mut self, handle: RxPacketHandle, dst: &mut [u8]) -> usize {
        let state = self.shared.state();
        let Some(packet) = state.held.get(&handle) else {
            return 0;
        };
        let available = packet.copy_limit.map_or(packet.bytes.len(), |limit| {
            limit.min(packet.bytes.len())
        });
        let n = available.min(dst.len());
        dst[..n].copy_from_slice(&packet.bytes[..n]);
        n
    }

    fn release_rx_packet(&mut self, handle: RxPacketHandle) -> Result<(), EngineError> {
        let mut state = self.shared.state();
        state
            .held
            .remove(&handle)
            .ok_or(EngineError::InvalidHandle(handle))?;
        state.released += 1;
        Ok(())
    }

    fn start_average_rssi(
        &mut self,
        channel: u8,
        _averaging_time_us: u32,
    ) -> Result<(), EngineError> {
        let auto_complete = {
            let mut state = self.shared.state();
            state.check_channel(channel)?;
            state.receiving = false;
            state.scan_channel = Some(channel);
            state.auto_complete_scan
        };
        if auto_complete {
            self.shared.raise(RadioEvents::RSSI_AVERAGE_DONE);
        }
        Ok(())
    }

    fn is_receiving(&self) -> bool {
        self.shared.state().receiving
    }

    fn rssi_quarter_dbm(&mut self) -> Option<i16> {
        let state = self.shared.state();
        if state.receiving {
            state.rssi_quarter_dbm
        } else {
            None
        }
    }

    fn set_pan_id(&mut self, pan_id: u16) -> Result<(), EngineError> {
        self.shared.state().pan_id = pan_id;
        Ok(())
    }

    fn set_short_address(&mut self, address: u16) -> Result<(), EngineError> {
        self.shared.state().short_address = address;
        Ok(())
    }

    fn set_extended_address(&mut self, address: &ExtAddress) -> Result<(), EngineError> {
        self.shared.state().extended_address = *address;
        Ok(())
    }

    fn set_promiscuous(&mut self, enable: bool) -> Result<(), EngineError> {
        self.shared.state().promiscuous = enable;
        Ok(())
    }

    fn unique_id(&self) -> u64 {
        self.shared.state().unique_id
    }
}

impl SimRadio {
    /// Route engine events to `dispatcher`
    pub fn attach(&self, dispatcher: EventDispatcher) {
        *self
            .shared
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(dispatcher);
    }

    // ---- air side ----

    /// A well-formed data frame arrives
    pub fn inject_frame(&self, mac: &[u8]) {
        self.inject_frame_with(mac, -60, 200);
    }

    /// A data frame arrives with the given signal metrics
    pub fn inject_frame_with(&self, mac: &[u8], rssi_dbm: i8, lqi: u8) {
        self.inject_packet(SimPacket::from_mac(
            mac,
            RxPacketDetails {
                is_ack: false,
                rssi_dbm,
                lqi,
                time_us: 0,
            },
        ));
    }

    /// A hardware-matched ACK arrives
    pub fn inject_ack(&self, sequence: u8, frame_pending: bool) {
        let mut fcf = IEEE802154_FRAME_TYPE_ACK;
        if frame_pending {
            fcf |= IEEE802154_FRAME_PENDING;
        }
        self.inject_packet(SimPacket::from_mac(
            &[fcf, 0x00, sequence],
            RxPacketDetails {
                is_ack: true,
                rssi_dbm: -40,
                lqi: 255,
                time_us: 0,
            },
        ));
    }

    /// Arbitrary packet arrives, including malformed ones
    pub fn inject_packet(&self, packet: SimPacket) {
        self.shared.state().arrive(packet);
        self.shared.raise(RadioEvents::RX_PACKET_RECEIVED);
    }

    /// Raise arbitrary events
    pub fn raise(&self, events: RadioEvents) {
        self.shared.raise(events);
    }

    /// The hardware ACK wait expires
    pub fn ack_timeout(&self) {
        self.shared.raise(RadioEvents::RX_ACK_TIMEOUT);
    }

    /// Finish the running energy scan with the ambient RSSI
    pub fn complete_energy_scan(&self) {
        self.shared.raise(RadioEvents::RSSI_AVERAGE_DONE);
    }

    /// The hardware asks for calibration
    pub fn request_calibration(&self) {
        self.shared.raise(RadioEvents::CAL_NEEDED);
    }

    /// A data request from `source` is acknowledged. Returns whether the ACK
    /// carried frame-pending.
    pub fn data_request(&self, source: MacAddress) -> bool {
        {
            let mut state = self.shared.state();
            state.data_request_source = Some(source);
            state.frame_pending_set = false;
        }
        self.shared.raise(RadioEvents::DATA_REQUEST_COMMAND);
        let mut state = self.shared.state();
        state.data_request_source = None;
        std::mem::take(&mut state.frame_pending_set)
    }

    // ---- behaviour ----

    pub fn set_tx_behavior(&self, behavior: TxBehavior) {
        self.shared.state().tx_behavior = behavior;
    }

    pub fn set_ack_behavior(&self, behavior: AckBehavior) {
        self.shared.state().ack_behavior = behavior;
    }

    /// Ambient RSSI in quarter-dBm; `None` reads as invalid
    pub fn set_rssi_quarter_dbm(&self, rssi: Option<i16>) {
        self.shared.state().rssi_quarter_dbm = rssi;
    }

    /// Complete energy scans as soon as they start
    pub fn set_auto_complete_scan(&self, enable: bool) {
        self.shared.state().auto_complete_scan = enable;
    }

    pub fn set_calibration_fails(&self, fails: bool) {
        self.shared.state().calibration_fails = fails;
    }

    // ---- inspection ----

    /// Band configurations loaded into the engine so far
    pub fn band_loads(&self) -> u32 {
        self.shared.state().band_loads
    }

    pub fn idle_aborts(&self) -> u32 {
        self.shared.state().idle_aborts
    }

    pub fn transmissions(&self) -> Vec<SimTransmission> {
        self.shared.state().tx_log.clone()
    }

    pub fn last_transmission(&self) -> Option<SimTransmission> {
        self.shared.state().tx_log.last().cloned()
    }

    /// Packets held and not yet released
    pub fn held_packets(&self) -> usize {
        self.shared.state().held.len()
    }

    pub fn released_packets(&self) -> u32 {
        self.shared.state().released
    }

    pub fn is_receiving(&self) -> bool {
        self.shared.state().receiving
    }

    pub fn channel(&self) -> u8 {
        self.shared.state().channel
    }

    pub fn scan_in_progress(&self) -> bool {
        self.shared.state().scan_channel.is_some()
    }

    pub fn event_mask(&self) -> RadioEvents {
        self.shared.state().event_mask
    }

    pub fn ieee_configured(&self) -> bool {
        self.shared.state().ieee_configured
    }

    pub fn ack_timeout_us(&self) -> u16 {
        self.shared.state().ack_timeout_us
    }

    pub fn tx_power_config(&self) -> Option<TxPowerConfig> {
        self.shared.state().tx_power_config
    }

    pub fn tx_power_deci_dbm(&self) -> i16 {
        self.shared.state().tx_power_deci_dbm
    }

    pub fn pan_id(&self) -> u16 {
        self.shared.state().pan_id
    }

    pub fn short_address(&self) -> u16 {
        self.shared.state().short_address
    }

    pub fn extended_address(&self) -> ExtAddress {
        self.shared.state().extended_address
    }

    pub fn promiscuous(&self) -> bool {
        self.shared.state().promiscuous
    }

    pub fn calibrations(&self) -> u32 {
        self.shared.state().calibrations
    }
}
