//! # IEEE 802.15.4 PHY Driver
//!
//! [`PhyDriver`] is the poll-context half of the driver: every entry point
//! and [`PhyDriver::process`] run here. Its callback-context half is the
//! [`EventDispatcher`] returned by [`PhyDriver::event_dispatcher`], which the
//! platform wires into the radio engine's event callback.
//!
//! ## Architecture
//!
//! ```text
//!   upper layer ──entry points──▶ PhyDriver ──commands──▶ RadioEngine
//!        ▲                           │  ▲                       │
//!        └──── PhyCallbacks ◀─ process()│                       │ events
//!                                       └── CallbackShared ◀─ EventDispatcher
//! ```
//!
//! Entry points validate against [`RadioState`] and return immediately; the
//! result says whether the request was accepted, not whether it finished.
//! Everything the hardware reports later is published by `process()`, which
//! the host calls every main-loop iteration (or whenever the wake signal
//! fires). Each call handles, in order:
//!
//! 1. transmit-started and transmit completion
//! 2. energy scan completion
//! 3. at most one received packet
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! let (engine, radio) = SimulatedEngine::new(0x0011_2233_4455_6677);
//! let mut phy = PhyDriver::new(engine, PhyConfig::default(), source_match, wake)?;
//! radio.attach(phy.event_dispatcher());
//!
//! phy.enable()?;
//! phy.receive(11)?;
//! loop {
//!     phy.process(&mut mac);
//! }
//! ```

use crate::config::PhyConfig;
use crate::constants::*;
use crate::error::PhyError;
use crate::radio::band::BandConfigTable;
use crate::radio::energy_scan::{EnergyScanController, EnergyScanMode, EnergyScanStatus};
use crate::radio::engine::{ExtAddress, IdleMode, RadioEngine};
use crate::radio::events::{CallbackShared, EventDispatcher, RadioEvents};
use crate::radio::frame::RadioFrame;
use crate::radio::receive::{ReceivePipeline, RxDisposition};
use crate::radio::source_match::SourceMatchTable;
use crate::radio::state::{RadioOp, RadioState};
use crate::radio::stats::PhyStats;
use crate::radio::transmit::TransmitPipeline;
use crate::radio::wake::WakeSignal;
use bitflags::bitflags;
use std::sync::Arc;

bitflags! {
    /// Capabilities the radio provides in hardware
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RadioCaps: u8 {
        /// Hardware waits for and times out ACKs
        const ACK_TIMEOUT = 1 << 0;
        /// Hardware energy scan
        const ENERGY_SCAN = 1 << 1;
        /// Hardware retransmission
        const TRANSMIT_RETRIES = 1 << 2;
        /// Hardware CSMA-CA backoff
        const CSMA_BACKOFF = 1 << 3;
    }
}

/// Upcalls into the upper layer, issued only from [`PhyDriver::process`]
pub trait PhyCallbacks {
    /// A transmission finished. `ack` is present only when an ACK was
    /// requested and a matching one arrived.
    fn transmit_done(
        &mut self,
        frame: &RadioFrame,
        ack: Option<&RadioFrame>,
        result: Result<(), PhyError>,
    );

    /// A frame was received
    fn receive_done(&mut self, frame: &RadioFrame, result: Result<(), PhyError>);

    /// An asynchronous energy scan finished; `None` is an invalid reading
    fn energy_scan_done(&mut self, rssi_dbm: Option<i8>);

    /// The hardware accepted a transmission
    fn transmit_started(&mut self, _frame: &RadioFrame) {}

    /// Transmission finished while in diagnostic mode
    fn diag_transmit_done(&mut self, _frame: &RadioFrame, _result: Result<(), PhyError>) {}

    /// Frame received while in diagnostic mode
    fn diag_receive_done(&mut self, _frame: &RadioFrame, _result: Result<(), PhyError>) {}
}

/// Single-radio IEEE 802.15.4 PHY driver
pub struct PhyDriver<E: RadioEngine> {
    engine: E,
    config: PhyConfig,
    state: RadioState,
    bands: BandConfigTable,
    tx: TransmitPipeline,
    rx: ReceivePipeline,
    scan: EnergyScanController,
    shared: Arc<CallbackShared>,
    dispatcher: EventDispatcher,
    wake: Arc<dyn WakeSignal>,
    /// Engine events are routed to the dispatcher; cleared by `deinit`
    subscribed: bool,
    tx_power_dbm: i8,
    diag_mode: bool,
    stats: PhyStats,
}

impl<E: RadioEngine> PhyDriver<E> {
    /// Initialize the engine for IEEE 802.15.4 and load the band of the
    /// configured default channel. The driver starts Disabled.
    pub fn new(
        mut engine: E,
        config: PhyConfig,
        source_match: Arc<dyn SourceMatchTable>,
        wake: Arc<dyn WakeSignal>,
    ) -> Result<Self, PhyError> {
        if let Err(e) = config.validate() {
            log::error!("Invalid PHY configuration: {e}");
            return Err(PhyError::InvalidArgs);
        }

        engine.configure_ieee802154(config.ack_timeout_us, &config.timings)?;
        engine.configure_events(RadioEvents::driver_mask())?;

        let mut bands = BandConfigTable::from_config(&config);
        let tx_power_dbm = config.transmit_power_dbm;
        bands.select(&mut engine, config.default_channel, deci_dbm(tx_power_dbm))?;

        let shared = Arc::new(CallbackShared::new(config.rx_ring_capacity));
        let dispatcher = EventDispatcher::new(shared.clone(), source_match, wake.clone());

        let mut rx = ReceivePipeline::new();
        rx.set_channel(config.default_channel);

        log::info!(
            "Initialized: channel={} power={}dBm bands={:?}",
            config.default_channel,
            tx_power_dbm,
            config.bands
        );

        Ok(Self {
            engine,
            config,
            state: RadioState::Disabled,
            bands,
            tx: TransmitPipeline::new(),
            rx,
            scan: EnergyScanController::new(),
            shared,
            dispatcher,
            wake,
            subscribed: true,
            tx_power_dbm,
            diag_mode: false,
            stats: PhyStats::default(),
        })
    }

    /// Stop the engine, unsubscribe from its events and forget the loaded
    /// band. A later [`enable`](Self::enable) subscribes again.
    pub fn deinit(&mut self) -> Result<(), PhyError> {
        self.engine.idle(IdleMode::Abort);
        self.engine.configure_events(RadioEvents::empty())?;
        self.subscribed = false;
        self.bands.forget();
        self.tx.reset(&self.shared);
        self.scan.reset(&self.shared);
        self.set_state(RadioState::Disabled);
        Ok(())
    }

    /// Callback-context half, to be invoked from the engine event callback
    pub fn event_dispatcher(&self) -> EventDispatcher {
        self.dispatcher.clone()
    }

    // ========================== STATE ENTRY POINTS ==========================

    pub fn state(&self) -> RadioState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_enabled()
    }

    /// Disabled → Sleep
    pub fn enable(&mut self) -> Result<(), PhyError> {
        let next = self.state.transition(RadioOp::Enable)?;
        if !self.subscribed {
            self.engine.configure_events(RadioEvents::driver_mask())?;
            self.subscribed = true;
        }
        self.set_state(next);
        Ok(())
    }

    /// Any state → Disabled, aborting hardware activity. Pending transmit and
    /// scan results are discarded without upcalls.
    pub fn disable(&mut self) -> Result<(), PhyError> {
        let next = self.state.transition(RadioOp::Disable)?;
        self.engine.idle(IdleMode::Abort);
        self.tx.reset(&self.shared);
        self.scan.reset(&self.shared);
        self.set_state(next);
        Ok(())
    }

    /// Sleep or Receive → Sleep, aborting any frame under reception
    pub fn sleep(&mut self) -> Result<(), PhyError> {
        let next = self.state.transition(RadioOp::Sleep)?;
        self.engine.idle(IdleMode::Abort);
        self.set_state(next);
        Ok(())
    }

    /// Start receiving on `channel`, reloading the band only if it changes
    pub fn receive(&mut self, channel: u8) -> Result<(), PhyError> {
        let next = self.state.transition(RadioOp::Receive)?;
        self.switch_band(channel, IdleMode::Abort)?;

        if let Err(e) = self.engine.start_rx(channel) {
            log::warn!("Failed to start RX on channel {channel}: {e}");
            return Err(PhyError::Failed);
        }

        self.rx.set_channel(channel);
        self.set_state(next);
        Ok(())
    }

    /// The long-lived transmit frame to fill before calling [`transmit`](Self::transmit)
    pub fn transmit_buffer(&mut self) -> &mut RadioFrame {
        self.tx.frame_mut()
    }

    /// Start transmitting the transmit buffer.
    ///
    /// `Ok` means accepted: the outcome, including an immediate hardware
    /// rejection, arrives through `transmit_done`.
    pub fn transmit(&mut self) -> Result<(), PhyError> {
        let next = self.state.transition(RadioOp::Transmit)?;
        if self.tx.is_active() {
            return Err(PhyError::Busy);
        }

        let channel = self.tx.frame().channel;
        if self.bands.lookup(channel).is_none() {
            return Err(PhyError::InvalidArgs);
        }
        self.tx.validate()?;
        self.switch_band(channel, IdleMode::Abort)?;

        self.set_state(next);
        self.tx.start(&mut self.engine, &self.shared, &self.config.csma);
        Ok(())
    }

    /// Start an asynchronous energy scan; the result arrives through
    /// `energy_scan_done`
    pub fn energy_scan(&mut self, channel: u8, duration_ms: u16) -> Result<(), PhyError> {
        self.start_energy_scan(
            EnergyScanMode::Async,
            channel,
            u32::from(duration_ms) * US_IN_MS,
        )
    }

    /// Start an energy scan averaging RSSI for `averaging_time_us`.
    ///
    /// In [`EnergyScanMode::Sync`] no upcall is made; poll
    /// [`take_energy_scan_result`](Self::take_energy_scan_result) instead.
    pub fn start_energy_scan(
        &mut self,
        mode: EnergyScanMode,
        channel: u8,
        averaging_time_us: u32,
    ) -> Result<(), PhyError> {
        if !self.state.is_enabled() {
            return Err(PhyError::InvalidState);
        }
        self.scan.ensure_idle()?;
        if self.bands.lookup(channel).is_none() {
            return Err(PhyError::InvalidArgs);
        }

        self.switch_band(channel, IdleMode::Idle)?;

        self.scan.begin(mode, &self.shared);
        if let Err(e) = self.engine.start_average_rssi(channel, averaging_time_us) {
            log::warn!("Energy scan on channel {channel} rejected: {e}");
            self.scan.reset(&self.shared);
            return Err(PhyError::Failed);
        }

        log::debug!(
            "Energy scan started: channel={channel} duration={averaging_time_us}us mode={mode:?}"
        );
        Ok(())
    }

    pub fn energy_scan_status(&self) -> EnergyScanStatus {
        self.scan.status()
    }

    /// Result of a synchronous scan, once. The inner `None` is an invalid
    /// reading.
    pub fn take_energy_scan_result(&mut self) -> Option<Option<i8>> {
        if self.scan.mode() != EnergyScanMode::Sync {
            return None;
        }
        if self.scan.poll(&self.shared) {
            self.stats.energy_scans = self.stats.energy_scans.wrapping_add(1);
        }
        self.scan.take_result()
    }

    // ========================== PROPERTIES ==========================

    /// Instantaneous RSSI in dBm, `None` when not receiving or invalid
    pub fn rssi(&mut self) -> Option<i8> {
        if !self.engine.is_receiving() {
            return None;
        }
        self.engine
            .rssi_quarter_dbm()
            .map(|q| (q / QUARTER_DBM_IN_DBM).clamp(i16::from(i8::MIN), i16::from(i8::MAX)) as i8)
    }

    pub fn set_pan_id(&mut self, pan_id: u16) -> Result<(), PhyError> {
        log::info!("PANID={pan_id:04X}");
        self.engine.set_pan_id(pan_id)?;
        Ok(())
    }

    pub fn set_short_address(&mut self, address: u16) -> Result<(), PhyError> {
        log::info!("ShortAddr={address:04X}");
        self.engine.set_short_address(address)?;
        Ok(())
    }

    /// `address` is least significant byte first
    pub fn set_extended_address(&mut self, address: &ExtAddress) -> Result<(), PhyError> {
        let mut display = *address;
        display.reverse();
        log::info!("ExtAddr={}", crate::util::hex::encode_hex_upper(&display));
        self.engine.set_extended_address(address)?;
        Ok(())
    }

    pub fn promiscuous(&self) -> bool {
        self.rx.promiscuous()
    }

    pub fn set_promiscuous(&mut self, enable: bool) -> Result<(), PhyError> {
        self.engine.set_promiscuous(enable)?;
        self.rx.set_promiscuous(enable);
        log::info!("Promiscuous={enable}");
        Ok(())
    }

    /// With source matching off, every data request is answered with
    /// frame-pending set
    pub fn enable_source_match(&mut self, enable: bool) {
        self.shared.set_source_match_enabled(enable);
    }

    pub fn transmit_power(&self) -> i8 {
        self.tx_power_dbm
    }

    pub fn set_transmit_power(&mut self, power_dbm: i8) -> Result<(), PhyError> {
        self.engine.set_tx_power_deci_dbm(deci_dbm(power_dbm))?;
        self.tx_power_dbm = power_dbm;
        Ok(())
    }

    pub fn receive_sensitivity(&self) -> i8 {
        self.config.receive_sensitivity_dbm
    }

    pub fn caps(&self) -> RadioCaps {
        RadioCaps::ACK_TIMEOUT | RadioCaps::CSMA_BACKOFF | RadioCaps::ENERGY_SCAN
    }

    /// EUI-64 from the engine's unique id, most significant byte first
    pub fn ieee_eui64(&self) -> [u8; EXT_ADDRESS_SIZE] {
        self.engine.unique_id().to_be_bytes()
    }

    pub fn diag_mode(&self) -> bool {
        self.diag_mode
    }

    /// Route completions to the diagnostic upcalls
    pub fn set_diag_mode(&mut self, enable: bool) {
        self.diag_mode = enable;
    }

    pub fn config(&self) -> &PhyConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Snapshot of poll-side and callback-side counters
    pub fn stats(&self) -> PhyStats {
        let mut stats = self.stats;
        stats.band_reloads = self.bands.reload_count();
        stats.merge_callback(self.shared.counters());
        stats
    }

    // ========================== PROCESS ==========================

    /// Perform all deferred work and issue upcalls. Returns whether anything
    /// was done; the wake signal is raised again in that case so the host
    /// keeps calling until idle.
    pub fn process<C: PhyCallbacks + ?Sized>(&mut self, callbacks: &mut C) -> bool {
        let mut work = self.process_transmit(callbacks);
        work |= self.process_energy_scan(callbacks);
        work |= self.process_receive(callbacks);

        if work {
            self.wake.signal();
        }
        work
    }

    fn process_transmit<C: PhyCallbacks + ?Sized>(&mut self, callbacks: &mut C) -> bool {
        let mut work = false;

        if let Some(outcome) = self.shared.take_tx_outcome() {
            work |= self.tx.absorb(outcome);
        }

        if self.tx.take_started() {
            work = true;
            self.stats.tx_started = self.stats.tx_started.wrapping_add(1);
            callbacks.transmit_started(self.tx.frame());
        }

        let Some(completion) = self.tx.take_completion() else {
            return work;
        };

        if let Ok(next) = self.state.transition(RadioOp::TransmitComplete) {
            self.set_state(next);
        }

        let counter = match completion.result {
            Ok(()) => &mut self.stats.tx_success,
            Err(PhyError::NoAck) => &mut self.stats.tx_no_ack,
            Err(PhyError::ChannelAccessFailure) => &mut self.stats.tx_channel_access_failure,
            Err(_) => &mut self.stats.tx_abort,
        };
        *counter = counter.wrapping_add(1);
        if completion.ack_matched {
            self.stats.acks_matched = self.stats.acks_matched.wrapping_add(1);
        }

        if let Err(e) = completion.result {
            log::debug!("Transmit failed: {e}");
        }

        let frame = self.tx.frame();
        if self.diag_mode {
            callbacks.diag_transmit_done(frame, completion.result);
        } else {
            let ack = completion.ack_matched.then(|| self.tx.ack_frame());
            callbacks.transmit_done(frame, ack, completion.result);
        }
        true
    }

    fn process_energy_scan<C: PhyCallbacks + ?Sized>(&mut self, callbacks: &mut C) -> bool {
        let mut work = false;
        if self.scan.poll(&self.shared) {
            work = true;
            self.stats.energy_scans = self.stats.energy_scans.wrapping_add(1);
        }

        if self.scan.mode() == EnergyScanMode::Async {
            if let Some(result) = self.scan.take_result() {
                log::debug!("Energy scan done: {result:?}");
                callbacks.energy_scan_done(result);
                work = true;
            }
        }
        work
    }

    fn process_receive<C: PhyCallbacks + ?Sized>(&mut self, callbacks: &mut C) -> bool {
        let Some(handle) = self.shared.pop_rx_handle() else {
            return false;
        };

        if !self.state.is_enabled() {
            if let Err(e) = self.engine.release_rx_packet(handle) {
                log::warn!("Failed to release RX packet {handle}: {e}");
            }
            return true;
        }

        match self.rx.process_packet(&mut self.engine, handle, &mut self.tx) {
            RxDisposition::Deliver => {
                self.stats.rx_delivered = self.stats.rx_delivered.wrapping_add(1);
                if self.diag_mode {
                    callbacks.diag_receive_done(self.rx.frame(), Ok(()));
                } else {
                    callbacks.receive_done(self.rx.frame(), Ok(()));
                }
            }
            RxDisposition::AckResolved => {}
            RxDisposition::Dropped(reason) => self.stats.record_drop(reason),
        }
        true
    }

    // ========================== INTERNALS ==========================

    /// Resolve the band of `channel` and load it if it differs from the
    /// current one, idling the engine with `idle` first
    fn switch_band(&mut self, channel: u8, idle: IdleMode) -> Result<(), PhyError> {
        let id = self.bands.lookup(channel).ok_or(PhyError::InvalidArgs)?;
        if idle == IdleMode::Idle {
            self.engine.idle(IdleMode::Idle);
        }
        if self.bands.needs_reload(id) {
            if idle == IdleMode::Abort {
                self.engine.idle(IdleMode::Abort);
            }
            self.bands.load(&mut self.engine, id, deci_dbm(self.tx_power_dbm))?;
        }
        Ok(())
    }

    fn set_state(&mut self, next: RadioState) {
        if self.state != next {
            log::info!("State={next}");
            self.state = next;
        }
    }
}

fn deci_dbm(dbm: i8) -> i16 {
    i16::from(dbm) * 10
}
