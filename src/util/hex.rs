//! # Hex Encoding/Decoding Utilities
//!
//! Thin helpers over the `hex` crate used for frame dumps in logs and for
//! parsing frames given on the command line.
//!
//! ```rust
//! use ieee802154_phy::util::hex::{decode_hex, format_hex_compact};
//!
//! let frame = decode_hex("41 88 05 cd ab").unwrap();
//! assert_eq!(frame, vec![0x41, 0x88, 0x05, 0xcd, 0xab]);
//! assert_eq!(format_hex_compact(&frame), "41 88 05 CD AB");
//! ```

use thiserror::Error;

/// Errors that can occur during hex decoding
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Odd number of hex characters: {0}")]
    OddLength(usize),

    #[error("Empty hex string")]
    EmptyString,

    #[error("Hex decoding error: {0}")]
    DecodeError(String),
}

/// Encode bytes to uppercase hex string
pub fn encode_hex_upper(data: &[u8]) -> String {
    hex::encode_upper(data)
}

/// Decode a hex string to bytes.
///
/// Accepts either case; whitespace, `:` and `-` separators are ignored.
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, HexError> {
    let cleaned: String = hex_str
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
        .collect();

    if cleaned.is_empty() {
        return Err(HexError::EmptyString);
    }
    if cleaned.len() % 2 != 0 {
        return Err(HexError::OddLength(cleaned.len()));
    }

    hex::decode(&cleaned).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Uppercase hex with a space between bytes
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
