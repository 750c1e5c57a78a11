//! # PHY Error Handling
//!
//! This module defines the error types returned by the driver entry points and
//! reported through the completion callbacks.

use thiserror::Error;

/// Errors reported by the PHY driver.
///
/// Entry-point validation errors are returned synchronously and leave the
/// driver state unchanged. `ChannelAccessFailure`, `NoAck` and `Abort` are
/// only ever delivered through `PhyCallbacks::transmit_done`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PhyError {
    /// Operation is not legal in the current radio state.
    #[error("Invalid state")]
    InvalidState,

    /// Channel or band could not be resolved, or a frame is malformed.
    #[error("Invalid arguments")]
    InvalidArgs,

    /// A conflicting operation is already in flight.
    #[error("Busy")]
    Busy,

    /// The radio engine does not support the requested capability.
    #[error("Not implemented")]
    NotImplemented,

    /// CSMA-CA could not acquire the channel.
    #[error("Channel access failure")]
    ChannelAccessFailure,

    /// An acknowledgment was requested but not received or did not match.
    #[error("No acknowledgment received")]
    NoAck,

    /// The hardware terminated the operation abnormally.
    #[error("Aborted")]
    Abort,

    /// The radio engine rejected the request.
    #[error("Failed")]
    Failed,

    /// `enable()` called while already enabled.
    #[error("Radio already enabled")]
    AlreadyEnabled,

    /// `disable()` called while already disabled.
    #[error("Radio already disabled")]
    AlreadyDisabled,
}

/// Errors returned by a radio engine implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine refused the command in its current state.
    #[error("Engine rejected command: {0}")]
    Rejected(&'static str),

    /// The referenced receive packet handle is unknown or already released.
    #[error("Invalid packet handle: {0}")]
    InvalidHandle(u32),

    /// Channel is outside the loaded channel configuration.
    #[error("Invalid channel: {0}")]
    InvalidChannel(u8),

    /// The engine does not implement this feature.
    #[error("Unsupported operation")]
    Unsupported,

    /// Band configuration load returned an unexpected first channel.
    #[error("Channel config mismatch: expected first channel {expected}, got {actual}")]
    ChannelConfigMismatch { expected: u8, actual: u16 },
}

impl From<EngineError> for PhyError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Unsupported => PhyError::NotImplemented,
            _ => PhyError::Failed,
        }
    }
}

/// Errors raised while loading or validating a [`PhyConfig`](crate::config::PhyConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No band enabled")]
    NoBands,

    #[error("Default channel {0} is not covered by any enabled band")]
    DefaultChannelUnsupported(u8),

    #[error("Invalid CSMA parameters: {0}")]
    InvalidCsma(String),

    #[error("Receive ring capacity must be between 1 and {max}, got {actual}")]
    InvalidRingCapacity { max: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_mapping() {
        assert_eq!(PhyError::from(EngineError::Unsupported), PhyError::NotImplemented);
        assert_eq!(PhyError::from(EngineError::InvalidChannel(3)), PhyError::Failed);
        assert_eq!(
            PhyError::from(EngineError::Rejected("tx fifo full")),
            PhyError::Failed
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(PhyError::NoAck.to_string(), "No acknowledgment received");
        assert_eq!(
            EngineError::ChannelConfigMismatch { expected: 1, actual: 0 }.to_string(),
            "Channel config mismatch: expected first channel 1, got 0"
        );
    }
}
