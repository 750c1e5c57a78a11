//! # ieee802154-phy - IEEE 802.15.4 PHY Driver
//!
//! A single-radio IEEE 802.15.4 PHY driver that sits between an
//! interrupt-driven radio engine and a poll-driven upper MAC layer.
//!
//! ## Features
//!
//! - Radio state machine (Disabled, Sleep, Receive, Transmit) with validated transitions
//! - Transmission with optional CSMA-CA and hardware ACK wait, ACK matching by sequence number
//! - Receive filtering of malformed and ACK-length frames, promiscuous mode
//! - Synchronous and asynchronous energy scans
//! - Multi-band channel table (2.4 GHz and 915 MHz O-QPSK) reloaded only on band changes
//! - Frame-pending answers to data requests from a source match table
//! - Simulated radio engine and a tokio poll loop for hosts and tests
//!
//! ## Usage
//!
//! ```rust
//! use ieee802154_phy::{
//!     PendingFlag, PhyConfig, PhyDriver, SimulatedEngine, StaticSourceMatchTable,
//! };
//! use std::sync::Arc;
//!
//! let (engine, radio) = SimulatedEngine::new(0x0011_2233_4455_6677);
//! let wake = Arc::new(PendingFlag::new());
//! let mut phy = PhyDriver::new(
//!     engine,
//!     PhyConfig::default(),
//!     Arc::new(StaticSourceMatchTable::default()),
//!     wake.clone(),
//! )
//! .unwrap();
//! radio.attach(phy.event_dispatcher());
//!
//! phy.enable().unwrap();
//! phy.receive(11).unwrap();
//! assert!(radio.is_receiving());
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod host;
pub mod logging;
pub mod radio;
pub mod sim;
pub mod util;

pub use crate::config::{BandPlan, CsmaConfig, PaMode, PhyConfig, RadioTimings};
pub use crate::error::{ConfigError, EngineError, PhyError};
pub use crate::logging::{init_logger, log_info};

// Driver and upcalls
pub use radio::{
    EnergyScanMode, EnergyScanStatus, EventDispatcher, PhyCallbacks, PhyDriver, PhyStats,
    RadioCaps, RadioEvents, RadioFrame, RadioState,
};

// Engine seam
pub use radio::{
    EngineCallbackContext, ExtAddress, IdleMode, MacAddress, RadioEngine, RxPacketHandle,
};

// Upper-layer hooks
pub use radio::{PendingFlag, SourceMatchTable, StaticSourceMatchTable, WakeSignal};

// Hosting
pub use host::{spawn_poll_loop, ChannelCallbacks, PhyEvent, PollLoopHandle};
pub use sim::{SimRadio, SimulatedEngine};
