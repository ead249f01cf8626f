//! Touchlink commissioning through the scripted stack.

mod common;

use bdb_controller::{BdbState, BootInfo, ControllerConfig};
use bdb_core::{Event, StackRequest};
use bdb_simulation::{MemoryKeyStore, ScriptedStack, ScriptedTarget, SimulationRunner};
use bdb_touchlink::TouchlinkConfig;
use bdb_types::{
    Channel, CommissioningRole, CommissioningSettings, DeviceType, ExtendedAddress,
    ExtendedPanId, NetworkAddress, NetworkType, PanId, ScanRequest, TerminalStatus,
    TouchlinkNetworkKind, TouchlinkNetworkParams,
};
use common::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_test::traced_test;

const LAMP: ExtendedAddress = ExtendedAddress(0x00_17_88_01_0000_0AAA);
const REMOTE: ExtendedAddress = ExtendedAddress(0x00_17_88_01_0000_0BBB);

fn touchlink_settings() -> CommissioningSettings {
    CommissioningSettings::default().with_touchlink(Channel(11), 0xA0)
}

fn make_initiator(scan_time_base: Duration, stack: ScriptedStack) -> SimulationRunner<ScriptedStack> {
    let config = ControllerConfig::new(DeviceType::Router, LOCAL_IEEE).with_touchlink(
        TouchlinkConfig {
            scan_time_base,
            ..Default::default()
        },
    );
    make_runner_with(
        config,
        Arc::new(MemoryKeyStore::new()),
        touchlink_settings(),
        BootInfo::factory_new(),
        stack,
    )
}

fn scan_channels<S: bdb_core::NetworkStack>(runner: &SimulationRunner<S>) -> Vec<u8> {
    runner
        .requests()
        .iter()
        .filter_map(|(_, r)| match r {
            StackRequest::TouchlinkScanRequest { channel, .. } => Some(channel.0),
            _ => None,
        })
        .collect()
}

#[traced_test]
#[test]
fn test_factory_new_node_listens_on_touchlink_channel() {
    let runner = make_initiator(Duration::from_millis(250), ScriptedStack::new());
    assert_eq!(runner.stack().channel(), Some(Channel(11)));
    assert_eq!(runner.controller().state(), BdbState::Idle);
}

#[traced_test]
#[test]
fn test_initiator_scan_order_then_steering_fallback() {
    let mut runner = make_initiator(Duration::from_millis(250), ScriptedStack::new());
    runner
        .invoke(|c| c.start_touchlink(CommissioningRole::Initiator))
        .unwrap();
    assert!(runner.run_until_idle(LIMIT));

    assert_eq!(
        scan_channels(&runner),
        vec![11, 11, 11, 11, 11, 15, 20, 25, 12, 13, 14, 16, 17, 18, 19, 21, 22, 23, 24, 26]
    );
    // No scan response: the node fell back to steering on every channel.
    assert!(runner.requests().iter().any(|(_, r)| matches!(
        r,
        StackRequest::ConfigureScan { channels, duration: 3 }
            if *channels == bdb_types::ChannelMask::ALL
    )));
    assert_eq!(
        runner.count_requests(|r| matches!(r, StackRequest::NetworkDiscovery { .. })),
        2
    );
    assert_eq!(runner.commissioning_results(), vec![TerminalStatus::NoNetwork]);
    assert_eq!(runner.controller().context().role, CommissioningRole::Target);
    // Back on the listen channel for the next touchlink attempt.
    assert_eq!(runner.stack().channel(), Some(Channel(11)));
}

#[traced_test]
#[test]
fn test_initiator_starts_network_through_target() {
    let stack = ScriptedStack::new().with_target(ScriptedTarget::new(LAMP, Channel(26)));
    let mut runner = make_initiator(Duration::from_millis(250), stack);
    runner
        .invoke(|c| c.start_touchlink(CommissioningRole::Initiator))
        .unwrap();
    assert!(runner.run_until_idle(LIMIT));

    assert_eq!(runner.commissioning_results(), vec![TerminalStatus::Success]);
    let (kind, params) = runner
        .requests()
        .iter()
        .find_map(|(_, r)| match r {
            StackRequest::TouchlinkNetworkRequest {
                target,
                kind,
                params,
                ..
            } if *target == LAMP => Some((*kind, *params)),
            _ => None,
        })
        .expect("network request sent");
    assert_eq!(kind, TouchlinkNetworkKind::Start);
    assert_eq!(params.channel, Channel(26));

    let network = runner.stack().saved_network().expect("network persisted");
    assert_eq!(network.extended_pan_id, params.extended_pan_id);
    assert_eq!(network.network_type, NetworkType::Distributed);
    assert_eq!(network.network_address, NetworkAddress(0x0002));
    assert!(!runner.controller().context().factory_new);
    assert!(runner.controller().attributes().node_is_on_a_network);
    assert_eq!(
        runner.controller().attributes().node_join_link_key_type,
        bdb_types::LinkKeyType::Touchlink
    );
}

#[traced_test]
#[test]
fn test_response_after_transaction_lifetime_is_ignored() {
    // With 500 ms per scan the last secondary channel is scanned 9.5 s into
    // the transaction.
    let stack = ScriptedStack::new().with_target(ScriptedTarget::new(LAMP, Channel(26)));
    let mut runner = make_initiator(Duration::from_millis(500), stack);
    runner
        .invoke(|c| c.start_touchlink(CommissioningRole::Initiator))
        .unwrap();
    assert!(runner.run_until_idle(LIMIT));

    assert_eq!(
        runner.count_requests(|r| matches!(r, StackRequest::TouchlinkNetworkRequest { .. })),
        0
    );
    assert_eq!(runner.commissioning_results(), vec![TerminalStatus::NoNetwork]);
    assert!(runner.stack().saved_network().is_none());
}

#[traced_test]
#[test]
fn test_rejecting_target_is_target_failure() {
    let stack = ScriptedStack::new().with_target(ScriptedTarget::new(LAMP, Channel(15)).rejecting());
    let mut runner = make_initiator(Duration::from_millis(250), stack);
    runner
        .invoke(|c| c.start_touchlink(CommissioningRole::Initiator))
        .unwrap();
    assert!(runner.run_until_idle(LIMIT));
    assert_eq!(
        runner.commissioning_results(),
        vec![TerminalStatus::TargetFailure]
    );
}

#[traced_test]
#[test]
fn test_weak_target_is_not_selected() {
    let stack =
        ScriptedStack::new().with_target(ScriptedTarget::new(LAMP, Channel(11)).with_lqi(0x40));
    let mut runner = make_initiator(Duration::from_millis(250), stack);
    runner
        .invoke(|c| c.start_touchlink(CommissioningRole::Initiator))
        .unwrap();
    assert!(runner.run_until_idle(LIMIT));
    assert_eq!(
        runner.count_requests(|r| matches!(r, StackRequest::TouchlinkNetworkRequest { .. })),
        0
    );
    assert_eq!(runner.commissioning_results(), vec![TerminalStatus::NoNetwork]);
}

#[traced_test]
#[test]
fn test_target_joins_network_started_by_initiator() {
    let mut runner = make_initiator(Duration::from_millis(250), ScriptedStack::new());
    let params = TouchlinkNetworkParams {
        extended_pan_id: ExtendedPanId(0x00_0D_6F_00_1234_5678),
        pan_id: PanId(0x6A6A),
        channel: Channel(20),
        network_key: Some(bdb_types::LinkKey([0x11; 16])),
        network_address: NetworkAddress(0x0001),
    };
    runner.inject(
        Duration::from_secs(1),
        Event::TouchlinkScanRequestReceived {
            request: ScanRequest {
                transaction_id: 0x0BAD_CAFE,
                source: REMOTE,
                lqi: 0xC8,
                factory_new: true,
                address_assignment: true,
                link_initiator: true,
            },
        },
    );
    runner.inject(
        Duration::from_millis(1200),
        Event::TouchlinkNetworkRequestReceived {
            source: REMOTE,
            transaction_id: 0x0BAD_CAFE,
            kind: TouchlinkNetworkKind::Start,
            params,
        },
    );
    runner.run_until(Duration::from_secs(10));

    assert!(runner.requests().iter().any(|(_, r)| matches!(
        r,
        StackRequest::TouchlinkScanResponse { destination, .. } if *destination == REMOTE
    )));
    assert!(runner.requests().iter().any(|(_, r)| matches!(
        r,
        StackRequest::TouchlinkNetworkResponse { success: true, .. }
    )));
    assert_eq!(runner.commissioning_results(), vec![TerminalStatus::Success]);
    assert!(runner.controller().is_idle());

    let network = runner.stack().saved_network().expect("network persisted");
    assert_eq!(network.extended_pan_id, params.extended_pan_id);
    assert_eq!(network.channel, Channel(20));
    assert_eq!(runner.controller().context().network, Some(network));
    assert_eq!(runner.controller().context().trust_center, None);
}

#[traced_test]
#[test]
fn test_target_ignores_scan_request_below_threshold() {
    let mut runner = make_initiator(Duration::from_millis(250), ScriptedStack::new());
    runner.inject(
        Duration::from_secs(1),
        Event::TouchlinkScanRequestReceived {
            request: ScanRequest {
                transaction_id: 7,
                source: REMOTE,
                lqi: 0x20,
                factory_new: true,
                address_assignment: true,
                link_initiator: true,
            },
        },
    );
    runner.run_until(Duration::from_secs(2));

    assert_eq!(
        runner.count_requests(|r| matches!(r, StackRequest::TouchlinkScanResponse { .. })),
        0
    );
    assert_eq!(runner.controller().state(), BdbState::Idle);
}

#[traced_test]
#[test]
fn test_target_reports_once_when_start_confirm_outlasts_rx_window() {
    let stack = ScriptedStack::new().with_latency(Duration::from_secs(6));
    let mut runner = make_initiator(Duration::from_millis(250), stack);
    let start = runner.now();
    let params = TouchlinkNetworkParams {
        extended_pan_id: ExtendedPanId(0x00_0D_6F_00_8765_4321),
        pan_id: PanId(0x1B1B),
        channel: Channel(25),
        network_key: Some(bdb_types::LinkKey([0x22; 16])),
        network_address: NetworkAddress(0x0001),
    };
    runner.inject(
        Duration::from_secs(1),
        Event::TouchlinkScanRequestReceived {
            request: ScanRequest {
                transaction_id: 0x5151,
                source: REMOTE,
                lqi: 0xC8,
                factory_new: true,
                address_assignment: true,
                link_initiator: true,
            },
        },
    );
    runner.inject(
        Duration::from_millis(1200),
        Event::TouchlinkNetworkRequestReceived {
            source: REMOTE,
            transaction_id: 0x5151,
            kind: TouchlinkNetworkKind::Start,
            params,
        },
    );

    // The RX window would have closed at 6.2 s; the confirm lands at 7.2 s.
    runner.run_until(start + Duration::from_secs(6) + Duration::from_millis(500));
    assert!(runner.commissioning_results().is_empty());
    assert_eq!(runner.controller().state(), BdbState::CommissioningTouchlink);

    runner.run_until(start + Duration::from_secs(20));
    assert_eq!(runner.commissioning_results(), vec![TerminalStatus::Success]);
    assert!(runner.controller().is_idle());
    let network = runner.stack().saved_network().expect("network persisted");
    assert_eq!(network.channel, Channel(25));
}
