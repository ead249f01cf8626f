//! Requests issued to the external network stack.

use bdb_types::{
    Channel, ChannelMask, ClusterId, Endpoint, ExtendedAddress, GroupId, LinkKey, LinkKeyConfig,
    NetworkAddress, NetworkDescriptor, NetworkInfo, NetworkType, ReportingConfig,
    TouchlinkNetworkKind, TouchlinkNetworkParams,
};
use std::time::Duration;

/// Where a binding points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindDestination {
    /// Group binding, no destination endpoint.
    Group(GroupId),
    /// Unicast binding to a remote endpoint.
    Unicast {
        address: ExtendedAddress,
        endpoint: Endpoint,
    },
}

/// Requests to the NWK/APS/ZDO stack.
///
/// The state machines never touch the radio; the runner hands these to a
/// [`NetworkStack`](crate::NetworkStack) and feeds its confirms back as events.
#[derive(Debug, Clone, PartialEq)]
pub enum StackRequest {
    // ═══════════════════════════════════════════════════════════════════════
    // Device Lifecycle
    // ═══════════════════════════════════════════════════════════════════════
    /// Configure security and preconfigured link keys.
    ConfigureSecurity {
        enabled: bool,
        link_keys: LinkKeyConfig,
        /// Install-code derived TC link key, replacing the global one.
        install_code_key: Option<LinkKey>,
    },

    /// Configure the channels and per-channel duration used by scans.
    ConfigureScan { channels: ChannelMask, duration: u8 },

    /// Bring a non-factory-new node back onto its persisted network.
    StartDevice {
        /// False on a retention wake-up: frame counters and keys are kept.
        cold_start: bool,
    },

    /// Leave the current network.
    Leave { rejoin: bool },

    /// Erase persisted network data except the outgoing frame counter.
    ResetToFactoryNew,

    /// Persist the current network parameters and keys.
    SaveNetworkInfo,

    /// Join (or re-establish) a known network without discovery.
    JoinFixedNetwork {
        network: NetworkInfo,
        network_key: LinkKey,
        trust_center: Option<ExtendedAddress>,
    },

    /// Retune the radio.
    SetChannel { channel: Channel },

    // ═══════════════════════════════════════════════════════════════════════
    // Network Steering
    // ═══════════════════════════════════════════════════════════════════════
    /// Scan for beacons on the given channels.
    NetworkDiscovery { channels: ChannelMask, duration: u8 },

    /// Associate with a discovered network.
    Associate { network: NetworkDescriptor },

    /// Rejoin a network this node was previously on.
    Rejoin { network: NetworkDescriptor },

    /// Mgmt_Permit_Joining_req to other devices.
    MgmtPermitJoin {
        destination: NetworkAddress,
        duration: Duration,
    },

    /// Open the local node for joiners.
    LocalPermitJoin { duration: Duration },

    // ═══════════════════════════════════════════════════════════════════════
    // Trust-Center Link-Key Exchange
    // ═══════════════════════════════════════════════════════════════════════
    /// Node_Desc_req, used to learn the trust center's stack revision.
    NodeDescriptorRequest { destination: NetworkAddress },

    /// APSME-REQUEST-KEY for a trust-center link key.
    RequestTcLinkKey { trust_center: NetworkAddress },

    /// Certificate-based key establishment with the trust center.
    KeyEstablishment { trust_center: NetworkAddress },

    /// APSME-VERIFY-KEY for a freshly received key.
    VerifyKey {
        trust_center: ExtendedAddress,
        key: LinkKey,
    },

    /// Replace the provisional TC link key with a verified one.
    InstallTcLinkKey {
        trust_center: ExtendedAddress,
        key: LinkKey,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Network Formation
    // ═══════════════════════════════════════════════════════════════════════
    /// Energy detection over the given channels.
    EnergyScan { channels: ChannelMask, duration: u8 },

    /// Form a new PAN on one of the given channels.
    FormNetwork {
        channels: ChannelMask,
        duration: u8,
        network_key: LinkKey,
        network_type: NetworkType,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Touchlink
    // ═══════════════════════════════════════════════════════════════════════
    /// Inter-PAN scan request on one channel.
    TouchlinkScanRequest {
        channel: Channel,
        transaction_id: u32,
        factory_new: bool,
        address_assignment: bool,
    },

    /// Inter-PAN scan response from a target.
    TouchlinkScanResponse {
        destination: ExtendedAddress,
        transaction_id: u32,
        response_id: u32,
        factory_new: bool,
        address_assignment: bool,
        key_bitmask: u16,
    },

    /// Ask the selected target to identify.
    TouchlinkIdentify {
        target: ExtendedAddress,
        transaction_id: u32,
        duration: u16,
    },

    /// Network start or join command to the selected target.
    TouchlinkNetworkRequest {
        target: ExtendedAddress,
        transaction_id: u32,
        kind: TouchlinkNetworkKind,
        params: TouchlinkNetworkParams,
    },

    /// Target's answer to a network start or join command.
    TouchlinkNetworkResponse {
        destination: ExtendedAddress,
        transaction_id: u32,
        success: bool,
    },

    /// Start operating on the network described by a touchlink exchange.
    TouchlinkApplyNetwork { params: TouchlinkNetworkParams },

    // ═══════════════════════════════════════════════════════════════════════
    // Finding & Binding
    // ═══════════════════════════════════════════════════════════════════════
    /// Broadcast Identify Query.
    IdentifyQuery { source_endpoint: Endpoint },

    /// Identify Query Response to an initiator.
    IdentifyQueryResponse {
        destination: NetworkAddress,
        endpoint: Endpoint,
        timeout: u16,
    },

    /// Write the local identify time.
    Identify { endpoint: Endpoint, duration: u16 },

    /// Simple_Desc_req.
    SimpleDescriptorRequest {
        destination: NetworkAddress,
        endpoint: Endpoint,
    },

    /// IEEE_addr_req.
    IeeeAddressRequest { destination: NetworkAddress },

    /// ZCL Add Group to a remote endpoint.
    AddGroup {
        destination: NetworkAddress,
        endpoint: Endpoint,
        group: GroupId,
    },

    /// Insert a local binding-table entry.
    Bind {
        source_endpoint: Endpoint,
        cluster: ClusterId,
        destination: BindDestination,
    },

    /// Configure default attribute reporting.
    ConfigureReporting(ReportingConfig),
}

impl StackRequest {
    /// Get a human-readable name for this request type.
    pub fn type_name(&self) -> &'static str {
        match self {
            StackRequest::ConfigureSecurity { .. } => "ConfigureSecurity",
            StackRequest::ConfigureScan { .. } => "ConfigureScan",
            StackRequest::StartDevice { .. } => "StartDevice",
            StackRequest::Leave { .. } => "Leave",
            StackRequest::ResetToFactoryNew => "ResetToFactoryNew",
            StackRequest::SaveNetworkInfo => "SaveNetworkInfo",
            StackRequest::JoinFixedNetwork { .. } => "JoinFixedNetwork",
            StackRequest::SetChannel { .. } => "SetChannel",
            StackRequest::NetworkDiscovery { .. } => "NetworkDiscovery",
            StackRequest::Associate { .. } => "Associate",
            StackRequest::Rejoin { .. } => "Rejoin",
            StackRequest::MgmtPermitJoin { .. } => "MgmtPermitJoin",
            StackRequest::LocalPermitJoin { .. } => "LocalPermitJoin",
            StackRequest::NodeDescriptorRequest { .. } => "NodeDescriptorRequest",
            StackRequest::RequestTcLinkKey { .. } => "RequestTcLinkKey",
            StackRequest::KeyEstablishment { .. } => "KeyEstablishment",
            StackRequest::VerifyKey { .. } => "VerifyKey",
            StackRequest::InstallTcLinkKey { .. } => "InstallTcLinkKey",
            StackRequest::EnergyScan { .. } => "EnergyScan",
            StackRequest::FormNetwork { .. } => "FormNetwork",
            StackRequest::TouchlinkScanRequest { .. } => "TouchlinkScanRequest",
            StackRequest::TouchlinkScanResponse { .. } => "TouchlinkScanResponse",
            StackRequest::TouchlinkIdentify { .. } => "TouchlinkIdentify",
            StackRequest::TouchlinkNetworkRequest { .. } => "TouchlinkNetworkRequest",
            StackRequest::TouchlinkNetworkResponse { .. } => "TouchlinkNetworkResponse",
            StackRequest::TouchlinkApplyNetwork { .. } => "TouchlinkApplyNetwork",
            StackRequest::IdentifyQuery { .. } => "IdentifyQuery",
            StackRequest::IdentifyQueryResponse { .. } => "IdentifyQueryResponse",
            StackRequest::Identify { .. } => "Identify",
            StackRequest::SimpleDescriptorRequest { .. } => "SimpleDescriptorRequest",
            StackRequest::IeeeAddressRequest { .. } => "IeeeAddressRequest",
            StackRequest::AddGroup { .. } => "AddGroup",
            StackRequest::Bind { .. } => "Bind",
            StackRequest::ConfigureReporting(_) => "ConfigureReporting",
        }
    }

    /// Check if this is an inter-PAN touchlink request.
    pub fn is_touchlink(&self) -> bool {
        matches!(
            self,
            StackRequest::TouchlinkScanRequest { .. }
                | StackRequest::TouchlinkScanResponse { .. }
                | StackRequest::TouchlinkIdentify { .. }
                | StackRequest::TouchlinkNetworkRequest { .. }
                | StackRequest::TouchlinkNetworkResponse { .. }
                | StackRequest::TouchlinkApplyNetwork { .. }
        )
    }

    /// Check if this is a ZDO request answered over the air.
    pub fn is_zdo(&self) -> bool {
        matches!(
            self,
            StackRequest::NodeDescriptorRequest { .. }
                | StackRequest::SimpleDescriptorRequest { .. }
                | StackRequest::IeeeAddressRequest { .. }
                | StackRequest::MgmtPermitJoin { .. }
        )
    }
}
