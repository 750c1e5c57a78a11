//! IEEE 802.15.4 PHY Constants
//!
//! Frame geometry and radio defaults used by the driver, based on
//! IEEE 802.15.4-2006 (O-QPSK PHYs).

/// Minimum PSDU length, including the 2-octet FCS
pub const IEEE802154_MIN_LENGTH: usize = 5;

/// Maximum PSDU length (aMaxPHYPacketSize)
pub const IEEE802154_MAX_LENGTH: usize = 127;

/// Length of an immediate acknowledgment frame, including FCS
pub const IEEE802154_ACK_LENGTH: usize = 5;

/// Length of the frame check sequence appended by the hardware
pub const IEEE802154_FCS_LENGTH: usize = 2;

/// Frame type field mask (frame control octet 0, bits 0-2)
pub const IEEE802154_FRAME_TYPE_MASK: u8 = 0x07;

/// Frame type value for acknowledgment frames
pub const IEEE802154_FRAME_TYPE_ACK: u8 = 0x02;

/// Frame pending bit (frame control octet 0, bit 4)
pub const IEEE802154_FRAME_PENDING: u8 = 1 << 4;

/// Acknowledgment request bit (frame control octet 0, bit 5)
pub const IEEE802154_ACK_REQUEST: u8 = 1 << 5;

/// Octet offset of the data sequence number
pub const IEEE802154_DSN_OFFSET: usize = 2;

/// Size of an extended (EUI-64) address
pub const EXT_ADDRESS_SIZE: usize = 8;

/// First/last channel of the 2.4 GHz O-QPSK PHY
pub const CHANNEL_2P4GHZ_MIN: u8 = 11;
pub const CHANNEL_2P4GHZ_MAX: u8 = 26;

/// First/last channel of the 915 MHz O-QPSK PHY
pub const CHANNEL_915MHZ_MIN: u8 = 1;
pub const CHANNEL_915MHZ_MAX: u8 = 10;

/// Number of band configurations the table can hold
pub const MAX_BAND_CONFIGS: usize = 2;

/// Sentinel used on the wire for an invalid RSSI reading
pub const RSSI_INVALID: i8 = 127;

/// Engine RSSI readings are in quarter-dBm
pub const QUARTER_DBM_IN_DBM: i16 = 4;

/// Microseconds per millisecond
pub const US_IN_MS: u32 = 1000;

/// Default receive sensitivity in dBm
pub const DEFAULT_RECEIVE_SENSITIVITY_DBM: i8 = -100;

/// Default channel loaded at init
pub const DEFAULT_CHANNEL: u8 = 11;

/// Default transmit power in dBm
pub const DEFAULT_TRANSMIT_POWER_DBM: i8 = 0;

/// Hardware ACK wait timeout in microseconds (54 symbols at 250 kbps, plus turnaround)
pub const DEFAULT_ACK_TIMEOUT_US: u16 = 894;

/// Capacity of the held receive packet ring
pub const RX_RING_CAPACITY: usize = 8;
