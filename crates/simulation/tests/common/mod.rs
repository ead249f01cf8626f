//! Shared fixtures for the scenario tests.

#![allow(dead_code)]

use bdb_controller::{BootInfo, CommissioningController, ControllerConfig};
use bdb_simulation::{MemoryKeyStore, ScriptedStack, SimulationRunner};
use bdb_types::{
    Channel, ClusterId, CommissioningSettings, DeviceType, Endpoint, ExtendedAddress,
    ExtendedPanId, NetworkAddress, NetworkDescriptor, NetworkInfo, NetworkType, PanId,
    SimpleDescriptor,
};
use std::sync::Arc;
use std::time::Duration;

pub const LOCAL_IEEE: ExtendedAddress = ExtendedAddress(0x00_12_4B_00_0000_0001);
pub const TC_IEEE: ExtendedAddress = ExtendedAddress(0x00_12_4B_00_0000_00C0);

/// Generous upper bound for any single procedure.
pub const LIMIT: Duration = Duration::from_secs(600);

/// A dimmer switch: Identify server, OnOff and LevelControl clients.
pub fn switch_descriptor() -> SimpleDescriptor {
    SimpleDescriptor::new(Endpoint(1), 0x0104)
        .with_in_clusters([ClusterId::BASIC, ClusterId::IDENTIFY])
        .with_out_clusters([ClusterId::ON_OFF])
}

/// A light on `endpoint` with OnOff and LevelControl servers.
pub fn light_descriptor(endpoint: u8) -> SimpleDescriptor {
    SimpleDescriptor::new(Endpoint(endpoint), 0x0100).with_in_clusters([
        ClusterId::BASIC,
        ClusterId::IDENTIFY,
        ClusterId::ON_OFF,
        ClusterId::LEVEL_CONTROL,
    ])
}

pub fn beacon(channel: u8, lqi: u8) -> NetworkDescriptor {
    NetworkDescriptor {
        pan_id: PanId(0x3C4D),
        extended_pan_id: ExtendedPanId(0x00_0D_6F_00_0AAA_BBBB),
        channel: Channel(channel),
        permit_joining: true,
        lqi,
    }
}

pub fn home_network() -> NetworkInfo {
    NetworkInfo {
        pan_id: PanId(0x3C4D),
        extended_pan_id: ExtendedPanId(0x00_0D_6F_00_0AAA_BBBB),
        channel: Channel(15),
        network_address: NetworkAddress(0x4F21),
        network_type: NetworkType::Distributed,
    }
}

pub fn make_controller(config: ControllerConfig, key_store: Arc<MemoryKeyStore>) -> CommissioningController {
    CommissioningController::new(config, key_store)
}

/// A controller for `device`, initialized from `boot` and run until idle.
pub fn make_runner(
    device: DeviceType,
    settings: CommissioningSettings,
    boot: BootInfo,
    stack: ScriptedStack,
) -> SimulationRunner<ScriptedStack> {
    make_runner_with(
        ControllerConfig::new(device, LOCAL_IEEE),
        Arc::new(MemoryKeyStore::new()),
        settings,
        boot,
        stack,
    )
}

pub fn make_runner_with(
    config: ControllerConfig,
    key_store: Arc<MemoryKeyStore>,
    settings: CommissioningSettings,
    boot: BootInfo,
    stack: ScriptedStack,
) -> SimulationRunner<ScriptedStack> {
    let mut runner = SimulationRunner::new(make_controller(config, key_store), stack);
    runner
        .invoke(|c| c.init(switch_descriptor(), settings, boot))
        .expect("init");
    assert!(runner.run_until_idle(LIMIT), "init did not finish");
    runner
}
