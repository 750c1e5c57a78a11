//! Receive path: delivery, filtering, handle release, ring overflow and the
//! callback-context work done on data requests and calibration.

mod sim_support;

use ieee802154_phy::radio::{RxPacketDetails, RxPacketStatus};
use ieee802154_phy::sim::SimPacket;
use ieee802154_phy::{
    MacAddress, PhyConfig, PhyEvent, RadioState, StaticSourceMatchTable,
};
use sim_support::{data_frame, received_frames, Harness};
use std::sync::Arc;

fn data_details() -> RxPacketDetails {
    RxPacketDetails {
        is_ack: false,
        rssi_dbm: -70,
        lqi: 100,
        time_us: 0,
    }
}

#[test]
fn test_frame_delivered_exactly_once() {
    let mut h = Harness::receiving(11);
    // 18 MAC octets + FCS = 20 octet PSDU
    let mac = data_frame(0x44, false, 9);
    assert_eq!(mac.len(), 18);

    h.radio.inject_frame_with(&mac, -55, 180);
    h.pump();
    let events = h.take_events();
    let frames = received_frames(&events);
    assert_eq!(frames.len(), 1);
    assert!(matches!(events[0], PhyEvent::ReceiveDone { result: Ok(()), .. }));

    let frame = &frames[0];
    assert_eq!(frame.length(), 20);
    assert_eq!(frame.payload(), mac.as_slice());
    assert_eq!(frame.channel, 11);
    assert_eq!(frame.rx_info.rssi_dbm, -55);
    assert_eq!(frame.rx_info.lqi, 180);
    assert!(frame.rx_info.timestamp_us > 0);
    assert!(frame.rx_info.acked_with_frame_pending);

    assert_eq!(h.radio.held_packets(), 0);
    assert_eq!(h.radio.released_packets(), 1);

    h.pump();
    assert!(h.take_events().is_empty());
    assert_eq!(h.phy.stats().rx_delivered, 1);
}

#[test]
fn test_one_packet_per_process_call() {
    let mut h = Harness::receiving(11);
    h.radio.inject_frame(&data_frame(1, false, 1));
    h.radio.inject_frame(&data_frame(2, false, 1));

    assert!(h.phy.process(&mut h.recorder));
    assert_eq!(received_frames(&h.recorder.events).len(), 1);
    assert!(h.phy.process(&mut h.recorder));
    assert!(!h.phy.process(&mut h.recorder));

    let frames = received_frames(&h.take_events());
    assert_eq!(frames[0].sequence(), 1);
    assert_eq!(frames[1].sequence(), 2);
}

#[test]
fn test_ack_length_data_frame_filtered_unless_promiscuous() {
    let mut h = Harness::receiving(11);
    // 3 MAC octets + FCS: ACK-sized, but a data frame
    let short = [0x41, 0x88, 0x07];

    h.radio.inject_frame(&short);
    h.pump();
    assert!(h.take_events().is_empty());
    assert_eq!(h.phy.stats().rx_dropped_ack_length_data, 1);
    assert_eq!(h.radio.held_packets(), 0);

    h.phy.set_promiscuous(true).unwrap();
    h.radio.inject_frame(&short);
    h.pump();
    let frames = received_frames(&h.take_events());
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].length(), 5);
}

#[test]
fn test_malformed_ack_dropped() {
    let mut h = Harness::receiving(11);
    h.radio.inject_packet(SimPacket::from_mac(
        &[0x02, 0x00, 0x01, 0x00],
        RxPacketDetails {
            is_ack: true,
            ..data_details()
        },
    ));
    h.pump();
    assert!(h.take_events().is_empty());
    assert_eq!(h.phy.stats().rx_dropped_malformed_ack, 1);
    assert_eq!(h.radio.released_packets(), 1);
}

#[test]
fn test_length_octet_mismatch_dropped() {
    let mut h = Harness::receiving(11);
    let mut packet = SimPacket::from_mac(&data_frame(1, false, 4), data_details());
    packet.bytes[0] += 1;
    h.radio.inject_packet(packet);
    h.pump();

    assert!(h.take_events().is_empty());
    assert_eq!(h.phy.stats().rx_dropped_length, 1);
    assert_eq!(h.radio.held_packets(), 0);
}

#[test]
fn test_truncated_copy_dropped() {
    let mut h = Harness::receiving(11);
    h.radio.inject_frame(&data_frame(1, false, 16));
    h.pump();
    assert_eq!(received_frames(&h.take_events()).len(), 1);

    // Length octet intact, but the engine hands over only part of the body
    let mut packet = SimPacket::from_mac(&data_frame(2, false, 16), data_details());
    packet.copy_limit = Some(6);
    h.radio.inject_packet(packet);
    h.pump();

    assert!(h.take_events().is_empty());
    assert_eq!(h.phy.stats().rx_dropped_length, 1);
    assert_eq!(h.phy.stats().rx_delivered, 1);
    assert_eq!(h.radio.held_packets(), 0);
}

#[test]
fn test_too_short_psdu_dropped() {
    let mut h = Harness::receiving(11);
    h.phy.set_promiscuous(true).unwrap();
    h.radio.inject_frame(&[0x41, 0x88]);
    h.pump();

    assert!(h.take_events().is_empty());
    assert_eq!(h.phy.stats().rx_dropped_length, 1);
}

#[test]
fn test_crc_error_dropped() {
    let mut h = Harness::receiving(11);
    let mut packet = SimPacket::from_mac(&data_frame(1, false, 4), data_details());
    packet.status = RxPacketStatus::ReadyCrcError;
    h.radio.inject_packet(packet);
    h.pump();

    assert!(h.take_events().is_empty());
    let stats = h.phy.stats();
    assert_eq!(stats.rx_dropped_not_ready, 1);
    assert_eq!(stats.rx_dropped(), 1);
    assert_eq!(h.radio.released_packets(), 1);
}

#[test]
fn test_packets_released_without_upcall_when_disabled() {
    let mut h = Harness::receiving(11);
    h.radio.inject_frame(&data_frame(1, false, 4));
    h.phy.disable().unwrap();

    h.pump();
    assert!(h.take_events().is_empty());
    assert_eq!(h.radio.held_packets(), 0);
    assert_eq!(h.radio.released_packets(), 1);
    assert_eq!(h.phy.state(), RadioState::Disabled);
}

#[test]
fn test_ring_overflow_leaves_packet_with_engine() {
    let config = PhyConfig {
        rx_ring_capacity: 2,
        ..PhyConfig::default()
    };
    let mut h = Harness::with_config(config);
    h.phy.enable().unwrap();
    h.phy.receive(11).unwrap();

    for seq in 0..3 {
        h.radio.inject_frame(&data_frame(seq, false, 2));
    }
    assert_eq!(h.radio.held_packets(), 2);
    assert_eq!(h.phy.stats().rx_ring_overflows, 1);

    h.pump();
    let frames = received_frames(&h.take_events());
    assert_eq!(frames.len(), 2);
    assert_eq!(h.radio.held_packets(), 0);
}

#[test]
fn test_diag_mode_routes_receive() {
    let mut h = Harness::receiving(11);
    h.phy.set_diag_mode(true);
    h.radio.inject_frame(&data_frame(1, false, 4));
    h.pump();

    let events = h.take_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], PhyEvent::DiagReceiveDone { result: Ok(()), .. }));
}

#[test]
fn test_frame_pending_without_source_match() {
    let h = Harness::receiving(11);
    assert!(h.radio.data_request(MacAddress::Short(0x9999)));
    assert_eq!(h.phy.stats().frame_pending_set, 1);
}

#[test]
fn test_frame_pending_from_source_match_table() {
    let table = StaticSourceMatchTable::new(
        vec![0x1234],
        vec![[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]],
    );
    let mut h = Harness::with_table(PhyConfig::default(), Arc::new(table));
    h.phy.enable_source_match(true);

    assert!(h.radio.data_request(MacAddress::Short(0x1234)));
    assert!(!h.radio.data_request(MacAddress::Short(0x4321)));
    assert!(h.radio.data_request(MacAddress::Extended([
        0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08
    ])));
    assert!(!h.radio.data_request(MacAddress::Extended([0; 8])));
    assert_eq!(h.phy.stats().frame_pending_set, 2);

    h.phy.enable_source_match(false);
    assert!(h.radio.data_request(MacAddress::Short(0x4321)));
}

#[test]
fn test_calibration_runs_in_callback() {
    let h = Harness::receiving(11);
    h.radio.request_calibration();
    assert_eq!(h.radio.calibrations(), 1);
    assert_eq!(h.phy.stats().calibrations, 1);

    h.radio.set_calibration_fails(true);
    h.radio.request_calibration();
    let stats = h.phy.stats();
    assert_eq!(stats.calibrations, 1);
    assert_eq!(stats.calibration_failures, 1);
}
