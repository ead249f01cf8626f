//! Core types for BDB commissioning.
//!
//! This crate holds the vocabulary shared by every commissioning
//! sub-procedure and the controller:
//!
//! - Identifiers: [`NetworkAddress`], [`ExtendedAddress`], [`Endpoint`], [`ClusterId`], ...
//! - Channel sets: [`ChannelMask`]
//! - Mode and capability sets: [`CommissioningMode`], [`NodeCapability`]
//! - Result codes: [`TerminalStatus`], [`CommissioningStatus`], [`StackStatus`]
//! - Keys: [`LinkKey`], [`LinkKeyConfig`], [`InstallCode`]
//! - Attributes: [`CommissioningAttributes`], [`AttributeId`]
//! - Finding & binding queue: [`DiscoveryQueue`]
//! - Touchlink inter-PAN payloads: [`ScanRequest`], [`ScanResponse`]

mod attributes;
mod channel;
mod constants;
mod descriptor;
mod error;
mod identifiers;
mod keys;
mod mode;
mod network;
mod queue;
mod settings;
mod status;
mod touchlink;

pub use attributes::{AttributeId, CommissioningAttributes};
pub use channel::ChannelMask;
pub use constants::*;
pub use descriptor::{ReportingConfig, SimpleDescriptor, HA_PROFILE_ID};
pub use error::{AttributeError, ReportingError};
pub use identifiers::{
    Channel, ClusterId, Endpoint, ExtendedAddress, ExtendedPanId, GroupId, NetworkAddress, PanId,
};
pub use keys::{
    InstallCode, KeyExchangeMethod, KeyScope, KeySlot, LinkKey, LinkKeyConfig, LinkKeyType,
    KEY_LEN,
};
pub use mode::{CommissioningMode, CommissioningRole, DeviceType, NetworkType, NodeCapability};
pub use network::{NetworkDescriptor, NetworkInfo};
pub use queue::{DiscoveryQueue, DiscoveryQueueFull, FindBindDestination};
pub use settings::CommissioningSettings;
pub use status::{CommissioningDetail, CommissioningStatus, StackStatus, TerminalStatus};
pub use touchlink::{
    ScanRequest, ScanResponse, TouchlinkNetworkKind, TouchlinkNetworkParams,
    TL_KEY_BITMASK_CERTIFICATION, TL_KEY_BITMASK_MASTER,
};
