//! # Driver Configuration
//!
//! `PhyConfig` collects every tunable the driver applies at init: default
//! channel and power, which band plans are compiled in, PA selection, the
//! hardware auto-ACK timing and the CSMA-CA parameters.
//!
//! The configuration can be loaded from JSON:
//! ```json
//! {
//!   "default_channel": 11,
//!   "transmit_power_dbm": 0,
//!   "bands": { "oqpsk_2p4ghz": true, "oqpsk_915mhz": false },
//!   "pa_mode": "HighPower"
//! }
//! ```
//! Missing fields take their defaults.

use crate::constants::*;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which band plans are available to the band table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandPlan {
    /// 2.4 GHz O-QPSK, channels 11-26
    pub oqpsk_2p4ghz: bool,
    /// 915 MHz O-QPSK, channels 1-10
    pub oqpsk_915mhz: bool,
}

impl Default for BandPlan {
    fn default() -> Self {
        Self {
            oqpsk_2p4ghz: true,
            oqpsk_915mhz: false,
        }
    }
}

/// Power amplifier used for the 2.4 GHz band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaMode {
    /// High power PA (up to +19 dBm)
    HighPower,
    /// Low power PA (up to 0 dBm)
    LowPower,
}

/// Radio turnaround timings in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioTimings {
    pub idle_to_rx_us: u16,
    pub tx_to_rx_us: u16,
    pub idle_to_tx_us: u16,
    pub rx_to_tx_us: u16,
}

impl Default for RadioTimings {
    fn default() -> Self {
        // aTurnaroundTime is 12 symbols (192 us); tx->rx leaves 10 us of margin
        Self {
            idle_to_rx_us: 100,
            tx_to_rx_us: 192 - 10,
            idle_to_tx_us: 100,
            rx_to_tx_us: 192,
        }
    }
}

/// CSMA-CA parameters handed to the engine for each CSMA transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsmaConfig {
    /// macMinBE
    pub min_backoff_exp: u8,
    /// macMaxBE
    pub max_backoff_exp: u8,
    /// macMaxCSMABackoffs + 1
    pub max_tries: u8,
    /// CCA energy threshold in dBm
    pub cca_threshold_dbm: i8,
    /// Unit backoff period in microseconds
    pub cca_backoff_us: u16,
    /// CCA measurement duration in microseconds
    pub cca_duration_us: u16,
    /// Overall CSMA timeout, 0 disables it
    pub timeout_us: u32,
}

impl Default for CsmaConfig {
    fn default() -> Self {
        // IEEE 802.15.4-2003 2.4 GHz O-QPSK defaults
        Self {
            min_backoff_exp: 3,
            max_backoff_exp: 5,
            max_tries: 5,
            cca_threshold_dbm: -75,
            cca_backoff_us: 320,
            cca_duration_us: 128,
            timeout_us: 0,
        }
    }
}

/// Complete driver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhyConfig {
    /// Channel whose band is loaded at init
    pub default_channel: u8,
    /// Transmit power applied at init, in dBm
    pub transmit_power_dbm: i8,
    /// Reported receive sensitivity, in dBm
    pub receive_sensitivity_dbm: i8,
    /// Band plans compiled into the band table
    pub bands: BandPlan,
    /// 2.4 GHz PA selection
    pub pa_mode: PaMode,
    /// PA supply voltage in millivolts
    pub pa_voltage_mv: u16,
    /// PA ramp time in microseconds
    pub pa_ramp_time_us: u16,
    /// Hardware auto-ACK wait timeout in microseconds
    pub ack_timeout_us: u16,
    /// Radio turnaround timings
    pub timings: RadioTimings,
    /// CSMA-CA parameters
    pub csma: CsmaConfig,
    /// Number of receive packets the callback context may hold before dropping
    pub rx_ring_capacity: usize,
}

impl Default for PhyConfig {
    fn default() -> Self {
        Self {
            default_channel: DEFAULT_CHANNEL,
            transmit_power_dbm: DEFAULT_TRANSMIT_POWER_DBM,
            receive_sensitivity_dbm: DEFAULT_RECEIVE_SENSITIVITY_DBM,
            bands: BandPlan::default(),
            pa_mode: PaMode::HighPower,
            pa_voltage_mv: 3300,
            pa_ramp_time_us: 10,
            ack_timeout_us: DEFAULT_ACK_TIMEOUT_US,
            timings: RadioTimings::default(),
            csma: CsmaConfig::default(),
            rx_ring_capacity: RX_RING_CAPACITY,
        }
    }
}

impl PhyConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: PhyConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.bands.oqpsk_2p4ghz && !self.bands.oqpsk_915mhz {
            return Err(ConfigError::NoBands);
        }

        let in_2p4 = self.bands.oqpsk_2p4ghz
            && (CHANNEL_2P4GHZ_MIN..=CHANNEL_2P4GHZ_MAX).contains(&self.default_channel);
        let in_915 = self.bands.oqpsk_915mhz
            && (CHANNEL_915MHZ_MIN..=CHANNEL_915MHZ_MAX).contains(&self.default_channel);
        if !in_2p4 && !in_915 {
            return Err(ConfigError::DefaultChannelUnsupported(self.default_channel));
        }

        if self.csma.min_backoff_exp > self.csma.max_backoff_exp {
            return Err(ConfigError::InvalidCsma(format!(
                "min_backoff_exp {} > max_backoff_exp {}",
                self.csma.min_backoff_exp, self.csma.max_backoff_exp
            )));
        }
        if self.csma.max_backoff_exp > 8 {
            return Err(ConfigError::InvalidCsma(format!(
                "max_backoff_exp {} exceeds 8",
                self.csma.max_backoff_exp
            )));
        }

        if self.rx_ring_capacity == 0 || self.rx_ring_capacity > RX_RING_CAPACITY {
            return Err(ConfigError::InvalidRingCapacity {
                max: RX_RING_CAPACITY,
                actual: self.rx_ring_capacity,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PhyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_channel, 11);
        assert_eq!(config.ack_timeout_us, 894);
        assert_eq!(config.timings.tx_to_rx_us, 182);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PhyConfig::from_json_str(r#"{ "transmit_power_dbm": 8 }"#).unwrap();
        assert_eq!(config.transmit_power_dbm, 8);
        assert_eq!(config.default_channel, DEFAULT_CHANNEL);
        assert_eq!(config.csma, CsmaConfig::default());
    }

    #[test]
    fn test_default_channel_must_be_in_enabled_band() {
        let err = PhyConfig::from_json_str(r#"{ "default_channel": 5 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::DefaultChannelUnsupported(5)));

        let config = PhyConfig::from_json_str(
            r#"{ "default_channel": 5, "bands": { "oqpsk_2p4ghz": true, "oqpsk_915mhz": true } }"#,
        )
        .unwrap();
        assert_eq!(config.default_channel, 5);
    }

    #[test]
    fn test_rejects_no_bands() {
        let err = PhyConfig::from_json_str(
            r#"{ "bands": { "oqpsk_2p4ghz": false, "oqpsk_915mhz": false } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::NoBands));
    }

    #[test]
    fn test_rejects_inverted_backoff_exponents() {
        let mut config = PhyConfig::default();
        config.csma.min_backoff_exp = 6;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidCsma(_))));
    }

    #[test]
    fn test_rejects_ring_capacity_out_of_range() {
        let mut config = PhyConfig::default();
        config.rx_ring_capacity = 0;
        assert!(config.validate().is_err());
        config.rx_ring_capacity = RX_RING_CAPACITY + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let config = PhyConfig {
            pa_mode: PaMode::LowPower,
            ..PhyConfig::default()
        };
        let json = config.to_json_string().unwrap();
        assert!(json.contains("\"LowPower\""));
        assert_eq!(PhyConfig::from_json_str(&json).unwrap(), config);
    }
}
