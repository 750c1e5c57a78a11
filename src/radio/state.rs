//! # Radio State Machine
//!
//! ```text
//!             enable            receive
//!  Disabled ─────────▶ Sleep ◀─────────▶ Receive ◀──────┐
//!     ▲                  │    sleep         │           │ completion
//!     │ disable          └──── transmit ────┴──▶ Transmit
//!     └──────────────── (from any state) ──────────────┘
//! ```
//!
//! Every entry point asks [`RadioState::transition`] for its target state
//! before touching the hardware, so the guards live in one place.

use crate::error::PhyError;
use std::fmt;

/// Top-level driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RadioState {
    /// Driver not accepting commands other than `enable`
    Disabled,
    /// Radio idle, receiver off
    Sleep,
    /// Receiver on
    Receive,
    /// A transmission is in flight or awaiting publication
    Transmit,
}

impl fmt::Display for RadioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RadioState::Disabled => "Disabled",
            RadioState::Sleep => "Sleep",
            RadioState::Receive => "Receive",
            RadioState::Transmit => "Transmit",
        };
        f.write_str(name)
    }
}

/// Operations that move the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioOp {
    Enable,
    Disable,
    Sleep,
    Receive,
    Transmit,
    /// Process() publishing a finished transmission
    TransmitComplete,
}

impl RadioState {
    /// Validate `op` in this state and return the state it leads to.
    ///
    /// Errors leave the caller's state untouched; `AlreadyEnabled` and
    /// `AlreadyDisabled` are tolerant no-ops rather than faults.
    pub fn transition(self, op: RadioOp) -> Result<RadioState, PhyError> {
        use RadioOp as Op;
        use RadioState::*;

        match (self, op) {
            (Disabled, Op::Enable) => Ok(Sleep),
            (_, Op::Enable) => Err(PhyError::AlreadyEnabled),

            (Disabled, Op::Disable) => Err(PhyError::AlreadyDisabled),
            (_, Op::Disable) => Ok(Disabled),

            (Sleep | Receive, Op::Sleep) => Ok(Sleep),
            (Disabled | Transmit, Op::Sleep) => Err(PhyError::InvalidState),

            (Disabled, Op::Receive) => Err(PhyError::InvalidState),
            (_, Op::Receive) => Ok(Receive),

            (Sleep | Receive, Op::Transmit) => Ok(Transmit),
            (Disabled | Transmit, Op::Transmit) => Err(PhyError::InvalidState),

            (Transmit, Op::TransmitComplete) => Ok(Receive),
            (_, Op::TransmitComplete) => Err(PhyError::InvalidState),
        }
    }

    /// The driver accepts commands
    pub fn is_enabled(self) -> bool {
        self != RadioState::Disabled
    }
}
