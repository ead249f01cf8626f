//! Controller configuration.

use bdb_finding_binding::FindBindConfig;
use bdb_formation::FormationConfig;
use bdb_steering::SteeringConfig;
use bdb_tclk::TcLinkKeyConfig;
use bdb_touchlink::TouchlinkConfig;
use bdb_types::{DeviceType, ExtendedAddress, NetworkAddress};
use std::time::Duration;

/// Configuration for the commissioning controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Logical device type of this node.
    pub device_type: DeviceType,

    /// This node's IEEE address.
    pub ieee_address: ExtendedAddress,

    /// Short address reported before the node has joined.
    pub network_address: NetworkAddress,

    /// Seed for touchlink identifiers and generated keys.
    pub seed: u64,

    /// Wait for the leave confirm during a factory reset.
    pub reset_leave_timeout: Duration,

    pub steering: SteeringConfig,
    pub tclk: TcLinkKeyConfig,
    pub formation: FormationConfig,
    pub touchlink: TouchlinkConfig,
    pub find_bind: FindBindConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::new(DeviceType::Router, ExtendedAddress(0x00_12_4b_00_0000_0001))
    }
}

impl ControllerConfig {
    pub fn new(device_type: DeviceType, ieee_address: ExtendedAddress) -> Self {
        let network_address = match device_type {
            DeviceType::Coordinator => NetworkAddress::COORDINATOR,
            _ => NetworkAddress(0xFFFE),
        };
        Self {
            device_type,
            ieee_address,
            network_address,
            seed: 12345,
            reset_leave_timeout: Duration::from_secs(3),
            steering: SteeringConfig::default(),
            tclk: TcLinkKeyConfig::default(),
            formation: FormationConfig::default(),
            touchlink: TouchlinkConfig::default(),
            find_bind: FindBindConfig::default(),
        }
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_steering(mut self, steering: SteeringConfig) -> Self {
        self.steering = steering;
        self
    }

    pub fn with_tclk(mut self, tclk: TcLinkKeyConfig) -> Self {
        self.tclk = tclk;
        self
    }

    pub fn with_formation(mut self, formation: FormationConfig) -> Self {
        self.formation = formation;
        self
    }

    pub fn with_touchlink(mut self, touchlink: TouchlinkConfig) -> Self {
        self.touchlink = touchlink;
        self
    }

    pub fn with_find_bind(mut self, find_bind: FindBindConfig) -> Self {
        self.find_bind = find_bind;
        self
    }
}
