//! Driver lifecycle, radio state transitions and property setters on the
//! simulated engine.

mod sim_support;

use ieee802154_phy::radio::TxPowerMode;
use ieee802154_phy::{PaMode, PhyConfig, PhyError, RadioCaps, RadioEvents, RadioState};
use sim_support::{data_frame, received_frames, transmit_done, Harness, UNIQUE_ID};

#[test]
fn test_init_configures_engine() {
    let h = Harness::new();

    assert_eq!(h.phy.state(), RadioState::Disabled);
    assert!(!h.phy.is_enabled());
    assert!(h.radio.ieee_configured());
    assert_eq!(h.radio.ack_timeout_us(), 894);
    assert_eq!(h.radio.event_mask(), RadioEvents::driver_mask());

    // Default channel's band is loaded once at init
    assert_eq!(h.radio.band_loads(), 1);
    assert_eq!(h.phy.stats().band_reloads, 1);

    let power = h.radio.tx_power_config().expect("tx power configured");
    assert_eq!(power.mode, TxPowerMode::TwoPointFourHighPower);
    assert_eq!(power.voltage_mv, 3300);
    assert_eq!(h.radio.tx_power_deci_dbm(), 0);
}

#[test]
fn test_init_low_power_pa() {
    let config = PhyConfig {
        pa_mode: PaMode::LowPower,
        transmit_power_dbm: -5,
        ..PhyConfig::default()
    };
    let h = Harness::with_config(config);

    let power = h.radio.tx_power_config().unwrap();
    assert_eq!(power.mode, TxPowerMode::TwoPointFourLowPower);
    assert_eq!(h.radio.tx_power_deci_dbm(), -50);
    assert_eq!(h.phy.transmit_power(), -5);
}

#[test]
fn test_init_rejects_invalid_config() {
    let (engine, _radio) = ieee802154_phy::SimulatedEngine::new(UNIQUE_ID);
    let config = PhyConfig {
        default_channel: 3,
        ..PhyConfig::default()
    };
    let result = ieee802154_phy::PhyDriver::new(
        engine,
        config,
        std::sync::Arc::new(ieee802154_phy::StaticSourceMatchTable::default()),
        std::sync::Arc::new(ieee802154_phy::PendingFlag::new()),
    );
    assert!(matches!(result, Err(PhyError::InvalidArgs)));
}

#[test]
fn test_enable_twice() {
    let mut h = Harness::new();
    assert!(h.phy.enable().is_ok());
    assert_eq!(h.phy.state(), RadioState::Sleep);
    assert_eq!(h.phy.enable(), Err(PhyError::AlreadyEnabled));
    assert_eq!(h.phy.state(), RadioState::Sleep);
}

#[test]
fn test_disable_twice() {
    let mut h = Harness::receiving(11);
    assert!(h.phy.disable().is_ok());
    assert_eq!(h.phy.state(), RadioState::Disabled);
    assert!(!h.radio.is_receiving());

    assert_eq!(h.phy.disable(), Err(PhyError::AlreadyDisabled));
    assert_eq!(h.phy.state(), RadioState::Disabled);
}

#[test]
fn test_sleep_transitions() {
    let mut h = Harness::new();
    assert_eq!(h.phy.sleep(), Err(PhyError::InvalidState));

    h.phy.enable().unwrap();
    assert!(h.phy.sleep().is_ok());
    assert_eq!(h.phy.state(), RadioState::Sleep);

    h.phy.receive(11).unwrap();
    assert!(h.radio.is_receiving());
    assert!(h.phy.sleep().is_ok());
    assert_eq!(h.phy.state(), RadioState::Sleep);
    assert!(!h.radio.is_receiving());
}

#[test]
fn test_receive_requires_enabled() {
    let mut h = Harness::new();
    assert_eq!(h.phy.receive(11), Err(PhyError::InvalidState));
    assert!(!h.radio.is_receiving());
}

#[test]
fn test_receive_starts_engine() {
    let mut h = Harness::new();
    h.phy.enable().unwrap();
    assert!(h.phy.receive(15).is_ok());
    assert_eq!(h.phy.state(), RadioState::Receive);
    assert!(h.radio.is_receiving());
    assert_eq!(h.radio.channel(), 15);

    // Already receiving: retune
    assert!(h.phy.receive(20).is_ok());
    assert_eq!(h.radio.channel(), 20);
}

#[test]
fn test_receive_on_unsupported_channel() {
    let mut h = Harness::new();
    h.phy.enable().unwrap();
    assert_eq!(h.phy.receive(5), Err(PhyError::InvalidArgs));
    assert_eq!(h.phy.state(), RadioState::Sleep);
    assert_eq!(h.phy.receive(27), Err(PhyError::InvalidArgs));
    assert_eq!(h.radio.band_loads(), 1);
}

#[test]
fn test_band_reloaded_only_when_band_changes() {
    let config = PhyConfig::from_json_str(
        r#"{ "bands": { "oqpsk_2p4ghz": true, "oqpsk_915mhz": true } }"#,
    )
    .unwrap();
    let mut h = Harness::with_config(config);
    h.phy.enable().unwrap();
    assert_eq!(h.radio.band_loads(), 1);

    h.phy.receive(11).unwrap();
    h.phy.receive(26).unwrap();
    assert_eq!(h.radio.band_loads(), 1);

    h.phy.receive(3).unwrap();
    assert_eq!(h.radio.band_loads(), 2);
    assert_eq!(h.radio.channel(), 3);

    h.phy.receive(10).unwrap();
    assert_eq!(h.radio.band_loads(), 2);

    h.phy.receive(12).unwrap();
    assert_eq!(h.radio.band_loads(), 3);
    assert_eq!(h.phy.stats().band_reloads, 3);
}

#[test]
fn test_band_reload_reapplies_transmit_power() {
    let config = PhyConfig::from_json_str(
        r#"{ "bands": { "oqpsk_2p4ghz": true, "oqpsk_915mhz": true } }"#,
    )
    .unwrap();
    let mut h = Harness::with_config(config);
    h.phy.enable().unwrap();
    h.phy.set_transmit_power(7).unwrap();

    h.phy.receive(1).unwrap();
    assert_eq!(h.radio.tx_power_deci_dbm(), 70);
    assert_eq!(
        h.radio.tx_power_config().unwrap().mode,
        TxPowerMode::SubGig
    );
}

#[test]
fn test_deinit_forgets_band() {
    let mut h = Harness::receiving(11);
    h.phy.deinit().unwrap();

    assert_eq!(h.phy.state(), RadioState::Disabled);
    assert_eq!(h.radio.event_mask(), RadioEvents::empty());
    assert!(!h.radio.is_receiving());

    h.phy.enable().unwrap();
    h.phy.receive(11).unwrap();
    assert_eq!(h.radio.band_loads(), 2);
}

#[test]
fn test_enable_after_deinit_restores_events() {
    let mut h = Harness::receiving(11);
    h.phy.deinit().unwrap();
    assert_eq!(h.radio.event_mask(), RadioEvents::empty());

    h.phy.enable().unwrap();
    assert_eq!(h.radio.event_mask(), RadioEvents::driver_mask());
    h.phy.receive(11).unwrap();

    h.radio.inject_frame(&data_frame(3, false, 11));
    h.pump();
    let events = h.take_events();
    let frames = received_frames(&events);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].length(), 22);

    let events = h.send(&data_frame(4, true, 4), 11, false);
    let (ack, result) = transmit_done(&events);
    assert_eq!(result, Ok(()));
    assert_eq!(ack.unwrap().sequence(), 4);
}

#[test]
fn test_address_setters_reach_engine() {
    let mut h = Harness::new();
    h.phy.set_pan_id(0xabcd).unwrap();
    h.phy.set_short_address(0x1234).unwrap();
    h.phy
        .set_extended_address(&[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01])
        .unwrap();

    assert_eq!(h.radio.pan_id(), 0xabcd);
    assert_eq!(h.radio.short_address(), 0x1234);
    assert_eq!(
        h.radio.extended_address(),
        [0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]
    );
}

#[test]
fn test_promiscuous_setter() {
    let mut h = Harness::new();
    assert!(!h.phy.promiscuous());
    h.phy.set_promiscuous(true).unwrap();
    assert!(h.phy.promiscuous());
    assert!(h.radio.promiscuous());
}

#[test]
fn test_transmit_power() {
    let mut h = Harness::new();
    h.phy.set_transmit_power(12).unwrap();
    assert_eq!(h.phy.transmit_power(), 12);
    assert_eq!(h.radio.tx_power_deci_dbm(), 120);
}

#[test]
fn test_rssi_only_while_receiving() {
    let mut h = Harness::new();
    h.phy.enable().unwrap();
    assert_eq!(h.phy.rssi(), None);

    h.phy.receive(11).unwrap();
    assert_eq!(h.phy.rssi(), Some(-90));

    h.radio.set_rssi_quarter_dbm(Some(-290));
    assert_eq!(h.phy.rssi(), Some(-72));

    h.radio.set_rssi_quarter_dbm(None);
    assert_eq!(h.phy.rssi(), None);
}

#[test]
fn test_static_properties() {
    let h = Harness::new();
    assert_eq!(h.phy.receive_sensitivity(), -100);
    assert_eq!(
        h.phy.caps(),
        RadioCaps::ACK_TIMEOUT | RadioCaps::CSMA_BACKOFF | RadioCaps::ENERGY_SCAN
    );
    assert!(!h.phy.caps().contains(RadioCaps::TRANSMIT_RETRIES));
    assert_eq!(
        h.phy.ieee_eui64(),
        [0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77]
    );
}

#[test]
fn test_config_file_drives_init() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "default_channel": 2, "transmit_power_dbm": 4,
             "bands": {{ "oqpsk_2p4ghz": false, "oqpsk_915mhz": true }} }}"#
    )
    .unwrap();

    let config = PhyConfig::from_file(file.path()).unwrap();
    let mut h = Harness::with_config(config);
    assert_eq!(h.radio.tx_power_deci_dbm(), 40);
    assert_eq!(h.radio.tx_power_config().unwrap().mode, TxPowerMode::SubGig);

    h.phy.enable().unwrap();
    assert_eq!(h.phy.receive(11), Err(PhyError::InvalidArgs));
    assert!(h.phy.receive(2).is_ok());
    assert_eq!(h.radio.band_loads(), 1);
}
