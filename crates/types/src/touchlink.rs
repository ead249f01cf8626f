//! Inter-PAN touchlink payloads.

use crate::{Channel, ExtendedAddress, ExtendedPanId, LinkKey, NetworkAddress, PanId};
use serde::{Deserialize, Serialize};

/// Key bitmask bit for the touchlink certification key.
pub const TL_KEY_BITMASK_CERTIFICATION: u16 = 1 << 15;

/// Key bitmask bit for the touchlink master key.
pub const TL_KEY_BITMASK_MASTER: u16 = 1 << 4;

/// A scan request heard by a touchlink target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub transaction_id: u32,
    pub source: ExtendedAddress,
    pub lqi: u8,
    pub factory_new: bool,
    pub address_assignment: bool,
    pub link_initiator: bool,
}

/// A scan response heard by a touchlink initiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResponse {
    pub transaction_id: u32,
    pub response_id: u32,
    pub source: ExtendedAddress,
    pub lqi: u8,
    pub factory_new: bool,
    pub address_assignment: bool,
    /// The target asks to be preferred (its touchlink button is held).
    pub priority_request: bool,
    pub key_bitmask: u16,
    pub extended_pan_id: ExtendedPanId,
    pub pan_id: PanId,
    pub channel: Channel,
    pub network_address: NetworkAddress,
}

/// Which network command an initiator sends to the chosen target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TouchlinkNetworkKind {
    /// Target forms a new network.
    Start,
    /// Target joins the initiator's network as a router.
    JoinRouter,
    /// Target joins the initiator's network as an end device.
    JoinEndDevice,
}

/// Network parameters carried by touchlink network start/join commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchlinkNetworkParams {
    pub extended_pan_id: ExtendedPanId,
    pub pan_id: PanId,
    pub channel: Channel,
    /// `None` when the sender's stack transports its active network key.
    pub network_key: Option<LinkKey>,
    /// Address assigned to the receiver of the command.
    pub network_address: NetworkAddress,
}
