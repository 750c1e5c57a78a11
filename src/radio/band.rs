//! # Band Configuration Table
//!
//! Maps channel ranges to RF band configurations. The table is built once at
//! init from the enabled [`BandPlan`] and never changes afterwards; only the
//! "currently loaded" band id moves.
//!
//! | Band               | Channels | Configuration             | PA      |
//! |--------------------|----------|---------------------------|---------|
//! | 2.4 GHz O-QPSK     | 11-26    | built-in engine PHY       | 2.4 GHz |
//! | 915 MHz O-QPSK     | 1-10     | [`OQPSK_915MHZ_PLAN`]     | Sub-GHz |
//!
//! Loading a band idles the radio and reconfigures it, so callers only reload
//! when [`BandConfigTable::needs_reload`] says the band actually changes.

use crate::config::{BandPlan, PaMode, PhyConfig};
use crate::constants::*;
use crate::error::{EngineError, PhyError};
use crate::radio::engine::{RadioEngine, TxPowerConfig, TxPowerMode};

/// Sub-GHz channel plan handed to the engine as an opaque configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPlan {
    pub name: &'static str,
    /// Centre frequency of `first_channel` in Hz
    pub base_frequency_hz: u32,
    pub channel_spacing_hz: u32,
    pub first_channel: u16,
    pub last_channel: u16,
}

impl ChannelPlan {
    /// Centre frequency of `channel`, if the plan defines it
    pub fn frequency_hz(&self, channel: u16) -> Option<u32> {
        if channel < self.first_channel || channel > self.last_channel {
            return None;
        }
        let offset = u32::from(channel - self.first_channel);
        Some(self.base_frequency_hz + offset * self.channel_spacing_hz)
    }
}

/// IEEE 802.15.4 915 MHz O-QPSK: Fc = 906 + 2 (k - 1) MHz, k = 1..10
pub const OQPSK_915MHZ_PLAN: ChannelPlan = ChannelPlan {
    name: "915MHz O-QPSK",
    base_frequency_hz: 906_000_000,
    channel_spacing_hz: 2_000_000,
    first_channel: CHANNEL_915MHZ_MIN as u16,
    last_channel: CHANNEL_915MHZ_MAX as u16,
};

/// Index into the band table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BandId(pub usize);

/// One immutable band entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandConfig {
    pub channel_min: u8,
    pub channel_max: u8,
    /// `None` selects the engine's built-in 2.4 GHz PHY
    pub channel_plan: Option<ChannelPlan>,
    pub power_mode: TxPowerMode,
}

impl BandConfig {
    pub fn contains(&self, channel: u8) -> bool {
        (self.channel_min..=self.channel_max).contains(&channel)
    }
}

/// Fixed-capacity band table plus the currently loaded band
#[derive(Debug, Clone)]
pub struct BandConfigTable {
    bands: [Option<BandConfig>; MAX_BAND_CONFIGS],
    current: Option<BandId>,
    pa_voltage_mv: u16,
    pa_ramp_time_us: u16,
    reloads: u32,
}

impl BandConfigTable {
    /// Build the table for the enabled bands. 2.4 GHz, when enabled, is band 0.
    pub fn new(plan: &BandPlan, pa_mode: PaMode, pa_voltage_mv: u16, pa_ramp_time_us: u16) -> Self {
        let mut bands = [None; MAX_BAND_CONFIGS];
        let mut index = 0;

        if plan.oqpsk_2p4ghz {
            bands[index] = Some(BandConfig {
                channel_min: CHANNEL_2P4GHZ_MIN,
                channel_max: CHANNEL_2P4GHZ_MAX,
                channel_plan: None,
                power_mode: match pa_mode {
                    PaMode::HighPower => TxPowerMode::TwoPointFourHighPower,
                    PaMode::LowPower => TxPowerMode::TwoPointFourLowPower,
                },
            });
            index += 1;
        }

        if plan.oqpsk_915mhz {
            bands[index] = Some(BandConfig {
                channel_min: CHANNEL_915MHZ_MIN,
                channel_max: CHANNEL_915MHZ_MAX,
                channel_plan: Some(OQPSK_915MHZ_PLAN),
                power_mode: TxPowerMode::SubGig,
            });
        }

        Self {
            bands,
            current: None,
            pa_voltage_mv,
            pa_ramp_time_us,
            reloads: 0,
        }
    }

    pub fn from_config(config: &PhyConfig) -> Self {
        Self::new(
            &config.bands,
            config.pa_mode,
            config.pa_voltage_mv,
            config.pa_ramp_time_us,
        )
    }

    /// Band owning `channel`
    pub fn lookup(&self, channel: u8) -> Option<BandId> {
        self.bands
            .iter()
            .position(|band| band.as_ref().is_some_and(|b| b.contains(channel)))
            .map(BandId)
    }

    pub fn get(&self, id: BandId) -> Option<&BandConfig> {
        self.bands.get(id.0).and_then(Option::as_ref)
    }

    /// Enabled bands in table order
    pub fn iter(&self) -> impl Iterator<Item = (BandId, &BandConfig)> {
        self.bands
            .iter()
            .enumerate()
            .filter_map(|(i, band)| band.as_ref().map(|b| (BandId(i), b)))
    }

    /// Currently loaded band
    pub fn current(&self) -> Option<BandId> {
        self.current
    }

    /// Loading `id` would change the engine configuration
    pub fn needs_reload(&self, id: BandId) -> bool {
        self.current != Some(id)
    }

    /// Number of band loads performed so far
    pub fn reload_count(&self) -> u32 {
        self.reloads
    }

    /// Forget the loaded band; the next request always reloads
    pub fn forget(&mut self) {
        self.current = None;
    }

    /// Resolve `channel` and load its band if it differs from the current one.
    ///
    /// The caller idles the engine first. `power_deci_dbm` is re-applied after
    /// a reload since the PA configuration resets it.
    pub fn select<E: RadioEngine>(
        &mut self,
        engine: &mut E,
        channel: u8,
        power_deci_dbm: i16,
    ) -> Result<BandId, PhyError> {
        let id = self.lookup(channel).ok_or(PhyError::InvalidArgs)?;
        if self.needs_reload(id) {
            self.load(engine, id, power_deci_dbm)?;
        }
        Ok(id)
    }

    /// Unconditionally load band `id` into the engine
    pub fn load<E: RadioEngine>(
        &mut self,
        engine: &mut E,
        id: BandId,
        power_deci_dbm: i16,
    ) -> Result<(), PhyError> {
        let band = *self.get(id).ok_or(PhyError::InvalidArgs)?;

        match band.channel_plan {
            Some(plan) => {
                let first = engine.config_channels(&plan)?;
                if first != u16::from(band.channel_min) {
                    return Err(EngineError::ChannelConfigMismatch {
                        expected: band.channel_min,
                        actual: first,
                    }
                    .into());
                }
            }
            None => engine.config_2p4ghz_radio()?,
        }

        engine.config_tx_power(&TxPowerConfig {
            mode: band.power_mode,
            voltage_mv: self.pa_voltage_mv,
            ramp_time_us: self.pa_ramp_time_us,
        })?;
        engine.set_tx_power_deci_dbm(power_deci_dbm)?;

        self.current = Some(id);
        self.reloads = self.reloads.wrapping_add(1);
        log::debug!(
            "Loaded band {} (channels {}-{}, {:?})",
            id.0,
            band.channel_min,
            band.channel_max,
            band.power_mode
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dual_band() -> BandConfigTable {
        BandConfigTable::new(
            &BandPlan {
                oqpsk_2p4ghz: true,
                oqpsk_915mhz: true,
            },
            PaMode::HighPower,
            3300,
            10,
        )
    }

    #[test]
    fn test_lookup() {
        let table = dual_band();
        assert_eq!(table.lookup(11), Some(BandId(0)));
        assert_eq!(table.lookup(26), Some(BandId(0)));
        assert_eq!(table.lookup(1), Some(BandId(1)));
        assert_eq!(table.lookup(10), Some(BandId(1)));
        assert_eq!(table.lookup(0), None);
        assert_eq!(table.lookup(27), None);
    }

    #[test]
    fn test_single_band_table() {
        let table = BandConfigTable::new(&BandPlan::default(), PaMode::LowPower, 1800, 10);
        assert_eq!(table.iter().count(), 1);
        assert_eq!(table.lookup(5), None);
        let band = table.get(BandId(0)).unwrap();
        assert_eq!(band.power_mode, TxPowerMode::TwoPointFourLowPower);
        assert!(band.channel_plan.is_none());
    }

    #[test]
    fn test_915_only_table_starts_at_zero() {
        let table = BandConfigTable::new(
            &BandPlan {
                oqpsk_2p4ghz: false,
                oqpsk_915mhz: true,
            },
            PaMode::HighPower,
            3300,
            10,
        );
        assert_eq!(table.lookup(3), Some(BandId(0)));
        assert_eq!(table.get(BandId(0)).unwrap().power_mode, TxPowerMode::SubGig);
    }

    #[test]
    fn test_needs_reload() {
        let mut table = dual_band();
        assert!(table.needs_reload(BandId(0)));
        table.current = Some(BandId(0));
        assert!(!table.needs_reload(BandId(0)));
        assert!(table.needs_reload(BandId(1)));
        table.forget();
        assert!(table.needs_reload(BandId(0)));
    }

    #[test]
    fn test_915_frequencies() {
        assert_eq!(OQPSK_915MHZ_PLAN.frequency_hz(1), Some(906_000_000));
        assert_eq!(OQPSK_915MHZ_PLAN.frequency_hz(10), Some(924_000_000));
        assert_eq!(OQPSK_915MHZ_PLAN.frequency_hz(11), None);
    }
}
