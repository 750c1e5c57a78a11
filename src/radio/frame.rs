//! # Radio Frames
//!
//! `RadioFrame` is the fixed-size PSDU buffer exchanged with the upper layer.
//! The driver owns exactly two of them (transmit and receive); the upper layer
//! only ever borrows one for the duration of a call or callback.

use crate::constants::*;

/// Metadata attached to a frame before transmission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxInfo {
    /// Perform CSMA-CA before transmitting
    pub csma_ca_enabled: bool,
}

/// Metadata attached to a received frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxInfo {
    /// Received signal strength in dBm
    pub rssi_dbm: i8,
    /// Link quality indicator
    pub lqi: u8,
    /// Engine timestamp of the end of the sync word, in microseconds
    pub timestamp_us: u32,
    /// The ACK we sent for this frame had frame-pending set
    pub acked_with_frame_pending: bool,
}

/// An IEEE 802.15.4 PSDU plus side-channel metadata.
///
/// `length` counts the PSDU including the 2-octet FCS, as carried in the PHY
/// header. The FCS itself is generated and stripped by the hardware, so only
/// the first `length - 2` octets of `psdu` are meaningful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioFrame {
    psdu: [u8; IEEE802154_MAX_LENGTH],
    length: u8,
    /// Channel the frame is sent or was received on
    pub channel: u8,
    /// Transmit metadata
    pub tx_info: TxInfo,
    /// Receive metadata
    pub rx_info: RxInfo,
}

impl Default for RadioFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl RadioFrame {
    /// Create an empty frame
    pub const fn new() -> Self {
        Self {
            psdu: [0u8; IEEE802154_MAX_LENGTH],
            length: 0,
            channel: 0,
            tx_info: TxInfo {
                csma_ca_enabled: false,
            },
            rx_info: RxInfo {
                rssi_dbm: 0,
                lqi: 0,
                timestamp_us: 0,
                acked_with_frame_pending: false,
            },
        }
    }

    /// PHY length field (PSDU length including FCS)
    pub fn length(&self) -> usize {
        self.length as usize
    }

    /// Set the PHY length field.
    ///
    /// Lengths above 127 are clamped; validation against the PHY minimum
    /// happens at transmit time.
    pub fn set_length(&mut self, length: usize) {
        self.length = length.min(IEEE802154_MAX_LENGTH) as u8;
    }

    /// Full PSDU storage
    pub fn psdu(&self) -> &[u8] {
        &self.psdu
    }

    /// Mutable PSDU storage
    pub fn psdu_mut(&mut self) -> &mut [u8] {
        &mut self.psdu
    }

    /// The MAC payload octets actually carried over the air (without FCS)
    pub fn payload(&self) -> &[u8] {
        let len = self.length().saturating_sub(IEEE802154_FCS_LENGTH);
        &self.psdu[..len]
    }

    /// Copy MAC octets (header + payload, without FCS) into the frame and set
    /// the length field to `mac.len() + 2`.
    ///
    /// Returns `false` and leaves the frame untouched if the result would
    /// exceed the PHY maximum.
    pub fn set_mac_frame(&mut self, mac: &[u8]) -> bool {
        let length = mac.len() + IEEE802154_FCS_LENGTH;
        if length > IEEE802154_MAX_LENGTH {
            return false;
        }
        self.psdu[..mac.len()].copy_from_slice(mac);
        self.length = length as u8;
        true
    }

    /// Length lies within the PHY bounds [5, 127]
    pub fn has_valid_length(&self) -> bool {
        is_valid_psdu_length(self.length())
    }

    /// Frame control requests an acknowledgment
    pub fn ack_requested(&self) -> bool {
        self.length > 0 && self.psdu[0] & IEEE802154_ACK_REQUEST != 0
    }

    /// Frame type subfield of the frame control field
    pub fn frame_type(&self) -> u8 {
        self.psdu[0] & IEEE802154_FRAME_TYPE_MASK
    }

    /// Frame is an immediate ACK by type and length
    pub fn is_ack(&self) -> bool {
        self.length() == IEEE802154_ACK_LENGTH && self.frame_type() == IEEE802154_FRAME_TYPE_ACK
    }

    /// Frame-pending bit of the frame control field
    pub fn frame_pending(&self) -> bool {
        self.psdu[0] & IEEE802154_FRAME_PENDING != 0
    }

    /// MAC data sequence number
    pub fn sequence(&self) -> u8 {
        self.psdu[IEEE802154_DSN_OFFSET]
    }
}

/// PSDU length lies within the PHY bounds [5, 127]
pub fn is_valid_psdu_length(length: usize) -> bool {
    (IEEE802154_MIN_LENGTH..=IEEE802154_MAX_LENGTH).contains(&length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_mac_frame() {
        let mut frame = RadioFrame::new();
        assert!(frame.set_mac_frame(&[0x61, 0x88, 0x05, 0xcd, 0xab]));
        assert_eq!(frame.length(), 7);
        assert_eq!(frame.payload(), &[0x61, 0x88, 0x05, 0xcd, 0xab]);
        assert!(frame.ack_requested());
        assert_eq!(frame.sequence(), 5);
        assert_eq!(frame.frame_type(), 0x01);
    }

    #[test]
    fn test_set_mac_frame_rejects_oversize() {
        let mut frame = RadioFrame::new();
        assert!(!frame.set_mac_frame(&[0u8; 126]));
        assert_eq!(frame.length(), 0);
        assert!(frame.set_mac_frame(&[0u8; 125]));
        assert_eq!(frame.length(), 127);
    }

    #[test]
    fn test_ack_detection() {
        let mut frame = RadioFrame::new();
        frame.set_mac_frame(&[0x02, 0x00, 0x2a]);
        assert!(frame.is_ack());
        assert!(!frame.frame_pending());

        frame.set_mac_frame(&[0x12, 0x00, 0x2a]);
        assert!(frame.is_ack());
        assert!(frame.frame_pending());

        // Right type, wrong length
        frame.set_mac_frame(&[0x02, 0x00, 0x2a, 0x00]);
        assert!(!frame.is_ack());
    }

    #[test]
    fn test_length_bounds() {
        assert!(!is_valid_psdu_length(4));
        assert!(is_valid_psdu_length(5));
        assert!(is_valid_psdu_length(127));
        assert!(!is_valid_psdu_length(128));
    }

    #[test]
    fn test_empty_frame_has_no_ack_request() {
        let mut frame = RadioFrame::new();
        frame.psdu_mut()[0] = IEEE802154_ACK_REQUEST;
        assert!(!frame.ack_requested());
        frame.set_length(10);
        assert!(frame.ack_requested());
    }
}
