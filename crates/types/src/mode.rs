//! Commissioning mode and capability sets, roles.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Which commissioning procedures a start request attempts.
    ///
    /// Bit layout matches the `commissioningMode` attribute.
    #[derive(Default)]
    pub struct CommissioningMode: u8 {
        const TOUCHLINK = 0b0000_0001;
        const NETWORK_STEERING = 0b0000_0010;
        const NETWORK_FORMATION = 0b0000_0100;
        const FINDING_BINDING = 0b0000_1000;
    }
}

bitflags! {
    /// Which commissioning procedures this node supports.
    ///
    /// Bit layout matches the `nodeCommissioningCapability` attribute.
    #[derive(Default)]
    pub struct NodeCapability: u8 {
        const NETWORK_STEERING = 0b0000_0001;
        const NETWORK_FORMATION = 0b0000_0010;
        const FINDING_BINDING = 0b0000_0100;
        const TOUCHLINK = 0b0000_1000;
    }
}

impl NodeCapability {
    /// Capabilities implied by the logical device type.
    pub fn for_device(device: DeviceType, touchlink: bool) -> Self {
        let mut caps = NodeCapability::NETWORK_STEERING | NodeCapability::FINDING_BINDING;
        if device.can_form_network() {
            caps |= NodeCapability::NETWORK_FORMATION;
        }
        if touchlink && device != DeviceType::Coordinator {
            caps |= NodeCapability::TOUCHLINK;
        }
        caps
    }
}

/// Role taken in a two-party procedure (touchlink, finding & binding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CommissioningRole {
    #[default]
    None,
    Initiator,
    Target,
}

impl fmt::Display for CommissioningRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommissioningRole::None => write!(f, "none"),
            CommissioningRole::Initiator => write!(f, "initiator"),
            CommissioningRole::Target => write!(f, "target"),
        }
    }
}

/// Security model of the network the node is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NetworkType {
    /// No trust center; routers admit joiners with a shared link key.
    #[default]
    Distributed,
    /// A trust center authorizes joiners and hands out keys.
    Centralized,
}

/// Logical device type of this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceType {
    Coordinator,
    #[default]
    Router,
    EndDevice,
}

impl DeviceType {
    /// End devices cannot form a PAN.
    pub fn can_form_network(self) -> bool {
        !matches!(self, DeviceType::EndDevice)
    }

    /// Only a coordinator forms a centralized network.
    pub fn formed_network_type(self) -> NetworkType {
        match self {
            DeviceType::Coordinator => NetworkType::Centralized,
            _ => NetworkType::Distributed,
        }
    }
}
