//! Network descriptions exchanged with the stack.

use crate::{Channel, ExtendedPanId, NetworkAddress, NetworkType, PanId};
use serde::{Deserialize, Serialize};

/// A network heard during discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    pub pan_id: PanId,
    pub extended_pan_id: ExtendedPanId,
    pub channel: Channel,
    /// The beaconing router currently admits joiners.
    pub permit_joining: bool,
    pub lqi: u8,
}

/// Parameters of the network this node is on, as persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub pan_id: PanId,
    pub extended_pan_id: ExtendedPanId,
    pub channel: Channel,
    pub network_address: NetworkAddress,
    pub network_type: NetworkType,
}
