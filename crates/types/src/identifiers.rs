//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 16-bit network (short) address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkAddress(pub u16);

impl NetworkAddress {
    /// The coordinator / trust center.
    pub const COORDINATOR: Self = NetworkAddress(0x0000);

    /// All routers and the coordinator.
    pub const BROADCAST_ROUTERS: Self = NetworkAddress(0xFFFC);

    /// All devices with the receiver on when idle.
    pub const BROADCAST_RX_ON_WHEN_IDLE: Self = NetworkAddress(0xFFFD);

    /// Every device in the PAN.
    pub const BROADCAST_ALL: Self = NetworkAddress(0xFFFF);

    /// Check if this is a broadcast address.
    pub fn is_broadcast(self) -> bool {
        self.0 >= 0xFFF8
    }
}

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// 64-bit IEEE (extended) address, EUI-64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtendedAddress(pub u64);

impl ExtendedAddress {
    /// Unassigned address.
    pub const ZERO: Self = ExtendedAddress(0);

    /// Erased / invalid address.
    pub const INVALID: Self = ExtendedAddress(u64::MAX);

    /// An address is usable only if it is neither zero nor erased.
    pub fn is_valid(self) -> bool {
        self != Self::ZERO && self != Self::INVALID
    }

    /// Over-the-air byte order.
    pub fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    /// Parse from over-the-air byte order.
    pub fn from_le_bytes(bytes: [u8; 8]) -> Self {
        ExtendedAddress(u64::from_le_bytes(bytes))
    }
}

impl fmt::Display for ExtendedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// 16-bit PAN identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PanId(pub u16);

impl fmt::Display for PanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pan(0x{:04x})", self.0)
    }
}

/// 64-bit extended PAN identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtendedPanId(pub u64);

impl fmt::Display for ExtendedPanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExtPan({:016x})", self.0)
    }
}

/// Application endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Endpoint(pub u8);

impl Endpoint {
    /// Broadcast endpoint.
    pub const BROADCAST: Self = Endpoint(0xFF);
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ep({})", self.0)
    }
}

/// ZCL cluster identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(pub u16);

impl ClusterId {
    pub const BASIC: Self = ClusterId(0x0000);
    pub const IDENTIFY: Self = ClusterId(0x0003);
    pub const GROUPS: Self = ClusterId(0x0004);
    pub const SCENES: Self = ClusterId(0x0005);
    pub const ON_OFF: Self = ClusterId(0x0006);
    pub const LEVEL_CONTROL: Self = ClusterId(0x0008);
    pub const COLOR_CONTROL: Self = ClusterId(0x0300);
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cluster(0x{:04x})", self.0)
    }
}

/// Multicast group identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u16);

impl GroupId {
    /// No commissioning group: finding & binding creates unicast bindings.
    pub const UNASSIGNED: Self = GroupId(0xFFFF);

    /// Check if this names a real group.
    pub fn is_assigned(self) -> bool {
        self != Self::UNASSIGNED
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Group(0x{:04x})", self.0)
    }
}

/// IEEE 802.15.4 channel in the 2.4 GHz band (11..=26).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Channel(pub u8);

impl Channel {
    pub const MIN: Self = Channel(11);
    pub const MAX: Self = Channel(26);

    /// Check if this channel lies in the 2.4 GHz page.
    pub fn is_valid(self) -> bool {
        (Self::MIN.0..=Self::MAX.0).contains(&self.0)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ch({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extended_address_validity() {
        assert!(!ExtendedAddress::ZERO.is_valid());
        assert!(!ExtendedAddress::INVALID.is_valid());
        assert!(ExtendedAddress(0x00124b0001020304).is_valid());
    }

    #[test]
    fn test_extended_address_byte_order() {
        let addr = ExtendedAddress(0x0102030405060708);
        assert_eq!(addr.to_le_bytes()[0], 0x08);
        assert_eq!(ExtendedAddress::from_le_bytes(addr.to_le_bytes()), addr);
        assert_eq!(addr.to_string(), "0102030405060708");
    }

    #[test]
    fn test_broadcast_addresses() {
        assert!(NetworkAddress::BROADCAST_ROUTERS.is_broadcast());
        assert!(NetworkAddress::BROADCAST_ALL.is_broadcast());
        assert!(!NetworkAddress::COORDINATOR.is_broadcast());
    }

    #[test]
    fn test_group_assignment() {
        assert!(!GroupId::UNASSIGNED.is_assigned());
        assert!(GroupId(0x0001).is_assigned());
    }

    #[test]
    fn test_channel_range() {
        assert!(Channel(11).is_valid());
        assert!(Channel(26).is_valid());
        assert!(!Channel(10).is_valid());
        assert!(!Channel(27).is_valid());
    }
}
