//! # Utility Modules
//!
//! Hex helpers and logging patterns shared by the driver and the CLI.

pub mod hex;
pub mod logging;

pub use hex::{decode_hex, encode_hex_upper, format_hex_compact, HexError};
pub use logging::{log_frame_hex, log_phy_stats, LogThrottle};
