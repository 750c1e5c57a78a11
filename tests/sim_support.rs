// Shared harness for driver integration tests: a PhyDriver on the simulated
// engine plus a recorder for upcalls.
#![allow(dead_code)]

use ieee802154_phy::logging::init_test_logger;
use ieee802154_phy::sim::{SimRadio, SimulatedEngine};
use ieee802154_phy::{
    PendingFlag, PhyCallbacks, PhyConfig, PhyDriver, PhyError, PhyEvent, RadioFrame,
    SourceMatchTable, StaticSourceMatchTable,
};
use std::sync::Arc;

pub const UNIQUE_ID: u64 = 0x0011_2233_4455_6677;

/// Upper layer stand-in that records every upcall
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<PhyEvent>,
}

impl PhyCallbacks for Recorder {
    fn transmit_done(
        &mut self,
        frame: &RadioFrame,
        ack: Option<&RadioFrame>,
        result: Result<(), PhyError>,
    ) {
        self.events.push(PhyEvent::TransmitDone {
            frame: frame.clone(),
            ack: ack.cloned(),
            result,
        });
    }

    fn receive_done(&mut self, frame: &RadioFrame, result: Result<(), PhyError>) {
        self.events.push(PhyEvent::ReceiveDone {
            frame: frame.clone(),
            result,
        });
    }

    fn energy_scan_done(&mut self, rssi_dbm: Option<i8>) {
        self.events.push(PhyEvent::EnergyScanDone { rssi_dbm });
    }

    fn transmit_started(&mut self, frame: &RadioFrame) {
        self.events.push(PhyEvent::TransmitStarted {
            frame: frame.clone(),
        });
    }

    fn diag_transmit_done(&mut self, frame: &RadioFrame, result: Result<(), PhyError>) {
        self.events.push(PhyEvent::DiagTransmitDone {
            frame: frame.clone(),
            result,
        });
    }

    fn diag_receive_done(&mut self, frame: &RadioFrame, result: Result<(), PhyError>) {
        self.events.push(PhyEvent::DiagReceiveDone {
            frame: frame.clone(),
            result,
        });
    }
}

pub struct Harness {
    pub phy: PhyDriver<SimulatedEngine>,
    pub radio: SimRadio,
    pub wake: Arc<PendingFlag>,
    pub recorder: Recorder,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(PhyConfig::default())
    }

    pub fn with_config(config: PhyConfig) -> Self {
        Self::with_table(config, Arc::new(StaticSourceMatchTable::default()))
    }

    pub fn with_table(config: PhyConfig, table: Arc<dyn SourceMatchTable>) -> Self {
        init_test_logger();
        let (engine, radio) = SimulatedEngine::new(UNIQUE_ID);
        let wake = Arc::new(PendingFlag::new());
        let phy = PhyDriver::new(engine, config, table, wake.clone()).expect("driver init");
        radio.attach(phy.event_dispatcher());
        Self {
            phy,
            radio,
            wake,
            recorder: Recorder::default(),
        }
    }

    /// Enabled and receiving on `channel`
    pub fn receiving(channel: u8) -> Self {
        let mut h = Self::new();
        h.phy.enable().unwrap();
        h.phy.receive(channel).unwrap();
        h
    }

    /// Call process() until it reports no work; returns the number of calls
    /// that did work
    pub fn pump(&mut self) -> usize {
        let mut worked = 0;
        for _ in 0..32 {
            if !self.phy.process(&mut self.recorder) {
                return worked;
            }
            worked += 1;
        }
        panic!("process() never went idle");
    }

    pub fn take_events(&mut self) -> Vec<PhyEvent> {
        std::mem::take(&mut self.recorder.events)
    }

    /// Fill the transmit buffer with `mac` for `channel`
    pub fn load_frame(&mut self, mac: &[u8], channel: u8, csma: bool) {
        let frame = self.phy.transmit_buffer();
        assert!(frame.set_mac_frame(mac));
        frame.channel = channel;
        frame.tx_info.csma_ca_enabled = csma;
    }

    /// Transmit `mac`, pump, and return the upcalls
    pub fn send(&mut self, mac: &[u8], channel: u8, csma: bool) -> Vec<PhyEvent> {
        self.load_frame(mac, channel, csma);
        self.phy.transmit().expect("transmit accepted");
        self.pump();
        self.take_events()
    }
}

/// Data frame, PAN ID compressed, short addressing, `payload_len` payload
/// octets. The PSDU length is `9 + payload_len + 2`.
pub fn data_frame(sequence: u8, ack_request: bool, payload_len: usize) -> Vec<u8> {
    let fcf0 = if ack_request { 0x61 } else { 0x41 };
    let mut mac = vec![fcf0, 0x88, sequence, 0xcd, 0xab, 0xff, 0xff, 0x34, 0x12];
    mac.extend((0..payload_len).map(|i| i as u8));
    mac
}

/// The only TransmitDone in `events`
pub fn transmit_done(events: &[PhyEvent]) -> (Option<RadioFrame>, Result<(), PhyError>) {
    let done: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            PhyEvent::TransmitDone { ack, result, .. } => Some((ack.clone(), *result)),
            _ => None,
        })
        .collect();
    assert_eq!(done.len(), 1, "expected exactly one transmit_done in {events:?}");
    done.into_iter().next().unwrap()
}

pub fn received_frames(events: &[PhyEvent]) -> Vec<RadioFrame> {
    events
        .iter()
        .filter_map(|e| match e {
            PhyEvent::ReceiveDone { frame, .. } => Some(frame.clone()),
            _ => None,
        })
        .collect()
}
