//! Events consumed by the commissioning state machines.

use crate::TimerId;
use bdb_types::{
    Channel, CommissioningDetail, Endpoint, ExtendedAddress, LinkKey, NetworkAddress,
    NetworkDescriptor, NetworkInfo, ScanRequest, ScanResponse, SimpleDescriptor, StackStatus,
    TerminalStatus, TouchlinkNetworkKind, TouchlinkNetworkParams,
};

/// Everything that can drive a commissioning state machine.
///
/// Stack events are confirms and indications from the external network
/// stack. Internal events are produced by the controller itself through
/// [`Action::EnqueueInternal`](crate::Action::EnqueueInternal) and carry the
/// result of a finished sub-procedure.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // ═══════════════════════════════════════════════════════════════════════
    // Timers
    // ═══════════════════════════════════════════════════════════════════════
    /// A timer armed with [`Action::SetTimer`](crate::Action::SetTimer) expired.
    TimerFired { id: TimerId },

    // ═══════════════════════════════════════════════════════════════════════
    // Device Lifecycle
    // ═══════════════════════════════════════════════════════════════════════
    /// The node (re)started on a network: answer to `StartDevice`,
    /// `JoinFixedNetwork`, `TouchlinkApplyNetwork`, or an unsolicited rejoin.
    StartDeviceConfirm {
        status: StackStatus,
        network: Option<NetworkInfo>,
    },

    /// Answer to `Leave`.
    LeaveConfirm { status: StackStatus },

    // ═══════════════════════════════════════════════════════════════════════
    // Network Steering
    // ═══════════════════════════════════════════════════════════════════════
    /// Beacons collected by a `NetworkDiscovery` scan.
    NetworkDiscoveryConfirm {
        status: StackStatus,
        networks: Vec<NetworkDescriptor>,
    },

    /// Answer to `Associate` or `Rejoin`.
    JoinConfirm {
        status: StackStatus,
        network: Option<NetworkInfo>,
        /// Trust center address, when the network is centralized.
        trust_center: Option<ExtendedAddress>,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Trust-Center Link-Key Exchange
    // ═══════════════════════════════════════════════════════════════════════
    /// Node_Desc_rsp.
    NodeDescriptorResponse {
        status: StackStatus,
        source: NetworkAddress,
        server_mask: u16,
    },

    /// APSME-TRANSPORT-KEY indication carrying a TC link key.
    TcLinkKeyReceived {
        trust_center: ExtendedAddress,
        key: LinkKey,
    },

    /// Answer to `VerifyKey`.
    VerifyKeyConfirm { status: StackStatus },

    // ═══════════════════════════════════════════════════════════════════════
    // Network Formation
    // ═══════════════════════════════════════════════════════════════════════
    /// Energy detected per channel; lower is quieter.
    EnergyScanConfirm {
        status: StackStatus,
        energies: Vec<(Channel, u8)>,
    },

    /// Answer to `FormNetwork`.
    FormationConfirm {
        status: StackStatus,
        network: Option<NetworkInfo>,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Touchlink
    // ═══════════════════════════════════════════════════════════════════════
    /// Scan request heard while listening as a target.
    TouchlinkScanRequestReceived { request: ScanRequest },

    /// Scan response heard by an initiator.
    TouchlinkScanResponseReceived { response: ScanResponse },

    /// Network start or join command heard by a target.
    TouchlinkNetworkRequestReceived {
        source: ExtendedAddress,
        transaction_id: u32,
        kind: TouchlinkNetworkKind,
        params: TouchlinkNetworkParams,
    },

    /// Target's answer to a network start or join command.
    TouchlinkNetworkResponseReceived {
        source: ExtendedAddress,
        transaction_id: u32,
        success: bool,
        /// Parameters of the network the target now operates on.
        params: Option<TouchlinkNetworkParams>,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Finding & Binding
    // ═══════════════════════════════════════════════════════════════════════
    /// Identify Query Response received by an initiator.
    IdentifyQueryResponse {
        source: NetworkAddress,
        endpoint: Endpoint,
        timeout: u16,
    },

    /// Identify Query received by a target.
    IdentifyQueryReceived {
        source: NetworkAddress,
        endpoint: Endpoint,
    },

    /// The local identify time was written by someone else.
    IdentifyTimeChanged { endpoint: Endpoint, remaining: u16 },

    /// Simple_Desc_rsp.
    SimpleDescriptorResponse {
        status: StackStatus,
        source: NetworkAddress,
        descriptor: Option<SimpleDescriptor>,
    },

    /// IEEE_addr_rsp.
    IeeeAddressResponse {
        status: StackStatus,
        source: NetworkAddress,
        ieee: ExtendedAddress,
    },

    /// Answer to `Bind`.
    BindConfirm { status: StackStatus },

    // ═══════════════════════════════════════════════════════════════════════
    // Internal Controller Events
    // ═══════════════════════════════════════════════════════════════════════
    /// Init finished.
    InitDone { success: bool },

    /// A start request passed the idle check.
    CommissioningStart,

    /// Touchlink heard no scan response and the node is factory new.
    TouchlinkNoResponse,

    /// Touchlink reached a terminal result.
    TouchlinkFinished { status: TerminalStatus },

    /// Steering joined; open the network.
    NetworkSteerPermitJoin,

    /// Steering joined a centralized network; exchange the TC link key.
    NetworkSteerRetrieveTcLinkKey,

    /// Steering reached a terminal result.
    NetworkSteerFinished {
        status: TerminalStatus,
        detail: Option<CommissioningDetail>,
    },

    /// Formation brought the PAN up; open it.
    NetworkFormationPermitJoin,

    /// Formation reached a terminal result.
    NetworkFormationFinished { status: TerminalStatus },

    /// Finding & binding should query the next queued endpoint.
    FindOrBindSimpleDescReq,

    /// Finding & binding reached a terminal result.
    FindOrBindFinished { status: TerminalStatus },

    /// An unsolicited rejoin finished.
    RejoinDone { status: TerminalStatus },
}

impl Event {
    /// Get a human-readable name for this event type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::TimerFired { .. } => "TimerFired",
            Event::StartDeviceConfirm { .. } => "StartDeviceConfirm",
            Event::LeaveConfirm { .. } => "LeaveConfirm",
            Event::NetworkDiscoveryConfirm { .. } => "NetworkDiscoveryConfirm",
            Event::JoinConfirm { .. } => "JoinConfirm",
            Event::NodeDescriptorResponse { .. } => "NodeDescriptorResponse",
            Event::TcLinkKeyReceived { .. } => "TcLinkKeyReceived",
            Event::VerifyKeyConfirm { .. } => "VerifyKeyConfirm",
            Event::EnergyScanConfirm { .. } => "EnergyScanConfirm",
            Event::FormationConfirm { .. } => "FormationConfirm",
            Event::TouchlinkScanRequestReceived { .. } => "TouchlinkScanRequestReceived",
            Event::TouchlinkScanResponseReceived { .. } => "TouchlinkScanResponseReceived",
            Event::TouchlinkNetworkRequestReceived { .. } => "TouchlinkNetworkRequestReceived",
            Event::TouchlinkNetworkResponseReceived { .. } => "TouchlinkNetworkResponseReceived",
            Event::IdentifyQueryResponse { .. } => "IdentifyQueryResponse",
            Event::IdentifyQueryReceived { .. } => "IdentifyQueryReceived",
            Event::IdentifyTimeChanged { .. } => "IdentifyTimeChanged",
            Event::SimpleDescriptorResponse { .. } => "SimpleDescriptorResponse",
            Event::IeeeAddressResponse { .. } => "IeeeAddressResponse",
            Event::BindConfirm { .. } => "BindConfirm",
            Event::InitDone { .. } => "InitDone",
            Event::CommissioningStart => "CommissioningStart",
            Event::TouchlinkNoResponse => "TouchlinkNoResponse",
            Event::TouchlinkFinished { .. } => "TouchlinkFinished",
            Event::NetworkSteerPermitJoin => "NetworkSteerPermitJoin",
            Event::NetworkSteerRetrieveTcLinkKey => "NetworkSteerRetrieveTcLinkKey",
            Event::NetworkSteerFinished { .. } => "NetworkSteerFinished",
            Event::NetworkFormationPermitJoin => "NetworkFormationPermitJoin",
            Event::NetworkFormationFinished { .. } => "NetworkFormationFinished",
            Event::FindOrBindSimpleDescReq => "FindOrBindSimpleDescReq",
            Event::FindOrBindFinished { .. } => "FindOrBindFinished",
            Event::RejoinDone { .. } => "RejoinDone",
        }
    }

    /// Check if this event is produced by the controller itself.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Event::InitDone { .. }
                | Event::CommissioningStart
                | Event::TouchlinkNoResponse
                | Event::TouchlinkFinished { .. }
                | Event::NetworkSteerPermitJoin
                | Event::NetworkSteerRetrieveTcLinkKey
                | Event::NetworkSteerFinished { .. }
                | Event::NetworkFormationPermitJoin
                | Event::NetworkFormationFinished { .. }
                | Event::FindOrBindSimpleDescReq
                | Event::FindOrBindFinished { .. }
                | Event::RejoinDone { .. }
        )
    }
}
