//! # IEEE 802.15.4 Radio Driver
//!
//! Single-radio PHY driver bridging an interrupt-driven radio engine to a
//! poll-driven upper MAC layer.
//!
//! ## Module Organization
//!
//! - [`driver`] - `PhyDriver`: entry points, `process()`, upcalls
//! - [`state`] - `RadioState` machine and its transition check
//! - [`events`] - `EventDispatcher` run in callback context, shared atomics
//! - [`transmit`] - transmit frame, CSMA/ACK bookkeeping
//! - [`receive`] - received packet classification
//! - [`energy_scan`] - RSSI averaging scans
//! - [`band`] - channel → band configuration table
//! - [`engine`] - `RadioEngine` and callback context traits
//! - [`frame`] - `RadioFrame`
//! - [`rx_ring`] - SPSC ring of held packet handles
//! - [`source_match`] - frame-pending address lookup
//! - [`wake`] - host wake signal
//! - [`stats`] - driver counters

pub mod band;
pub mod driver;
pub mod energy_scan;
pub mod engine;
pub mod events;
pub mod frame;
pub mod receive;
pub mod rx_ring;
pub mod source_match;
pub mod state;
pub mod stats;
pub mod transmit;
pub mod wake;

pub use band::{BandConfig, BandConfigTable, BandId, ChannelPlan, OQPSK_915MHZ_PLAN};
pub use driver::{PhyCallbacks, PhyDriver, RadioCaps};
pub use energy_scan::{EnergyScanMode, EnergyScanStatus};
pub use engine::{
    EngineCallbackContext, ExtAddress, IdleMode, MacAddress, RadioEngine, RxPacketDetails,
    RxPacketHandle, RxPacketInfo, RxPacketStatus, TxOptions, TxPowerConfig, TxPowerMode,
};
pub use events::{CallbackShared, EventDispatcher, RadioEvents, TxOutcome};
pub use frame::{RadioFrame, RxInfo, TxInfo};
pub use receive::{RxDisposition, RxDropReason};
pub use source_match::{SourceMatchTable, StaticSourceMatchTable};
pub use state::{RadioOp, RadioState};
pub use stats::PhyStats;
pub use wake::{PendingFlag, WakeSignal};
