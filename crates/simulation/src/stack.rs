//! Scripted network stack.

use bdb_core::{Event, NetworkStack, StackReply, StackRequest};
use bdb_types::{
    Channel, Endpoint, ExtendedAddress, ExtendedPanId, LinkKey, NetworkAddress,
    NetworkDescriptor, NetworkInfo, NetworkType, PanId, ScanResponse, SimpleDescriptor,
    StackStatus, TL_KEY_BITMASK_CERTIFICATION,
};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, trace};

/// PAN id given to networks this node forms.
const FORMED_PAN_ID: PanId = PanId(0x1A62);

/// Extended PAN id given to networks this node forms.
const FORMED_EXTENDED_PAN_ID: ExtendedPanId = ExtendedPanId(0x00_12_4B_00_1A62_0001);

/// A remote endpoint that answers identify queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Responder {
    pub address: NetworkAddress,
    pub ieee: ExtendedAddress,
    pub endpoint: Endpoint,

    /// Remaining identify time reported in the query response.
    pub identify_time: u16,

    /// `None` makes the simple-descriptor request go unanswered.
    pub descriptor: Option<SimpleDescriptor>,
}

impl Responder {
    pub fn new(address: NetworkAddress, ieee: ExtendedAddress, descriptor: SimpleDescriptor) -> Self {
        Self {
            address,
            ieee,
            endpoint: descriptor.endpoint,
            identify_time: 180,
            descriptor: Some(descriptor),
        }
    }

    pub fn with_identify_time(mut self, identify_time: u16) -> Self {
        self.identify_time = identify_time;
        self
    }

    /// Answer the identify query but never the simple-descriptor request.
    pub fn without_descriptor(mut self) -> Self {
        self.descriptor = None;
        self
    }
}

/// Behaviour of the trust center during the link-key exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustCenterScript {
    pub address: ExtendedAddress,

    /// Stack revision reported in the node descriptor.
    pub stack_revision: u8,

    /// Key handed out on request. `None` leaves requests unanswered.
    pub key: Option<LinkKey>,

    pub verify_status: StackStatus,
}

impl TrustCenterScript {
    /// A current trust center that hands out `key`.
    pub fn new(address: ExtendedAddress, key: LinkKey) -> Self {
        Self {
            address,
            stack_revision: 22,
            key: Some(key),
            verify_status: StackStatus::Success,
        }
    }

    /// A trust center that never answers key requests.
    pub fn silent(address: ExtendedAddress) -> Self {
        Self {
            address,
            stack_revision: 22,
            key: None,
            verify_status: StackStatus::Success,
        }
    }

    pub fn with_stack_revision(mut self, stack_revision: u8) -> Self {
        self.stack_revision = stack_revision;
        self
    }

    pub fn with_verify_status(mut self, verify_status: StackStatus) -> Self {
        self.verify_status = verify_status;
        self
    }
}

/// A touchlink target within radio range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptedTarget {
    /// Scan response template; the transaction id is filled in per request.
    pub response: ScanResponse,

    /// Channel the target listens on.
    pub channel: Channel,

    /// Accept network start/join requests.
    pub accept_network: bool,
}

impl ScriptedTarget {
    /// A factory-new target that accepts any network.
    pub fn new(source: ExtendedAddress, channel: Channel) -> Self {
        Self {
            response: ScanResponse {
                transaction_id: 0,
                response_id: 0x5EED,
                source,
                lqi: 0xD0,
                factory_new: true,
                address_assignment: true,
                priority_request: false,
                key_bitmask: TL_KEY_BITMASK_CERTIFICATION,
                extended_pan_id: ExtendedPanId(0),
                pan_id: PanId(0),
                channel,
                network_address: NetworkAddress(0xFFFF),
            },
            channel,
            accept_network: true,
        }
    }

    pub fn with_lqi(mut self, lqi: u8) -> Self {
        self.response.lqi = lqi;
        self
    }

    pub fn rejecting(mut self) -> Self {
        self.accept_network = false;
        self
    }
}

/// A [`NetworkStack`] that answers requests from a fixed script.
///
/// Replies arrive `latency` after the request. Requests the script has no
/// answer for go unanswered, which lets the state machines' timers fire.
#[derive(Debug, Clone)]
pub struct ScriptedStack {
    pub latency: Duration,

    /// Networks heard during discovery.
    pub networks: Vec<NetworkDescriptor>,

    /// Outcome of successive associate/rejoin requests. Empty means success.
    pub join_results: VecDeque<StackStatus>,

    /// Present when joined networks are centralized.
    pub trust_center: Option<TrustCenterScript>,

    /// Short address handed out on join.
    pub assigned_address: NetworkAddress,

    /// Energy per channel reported by energy scans.
    pub energies: Vec<(Channel, u8)>,

    pub formation_status: StackStatus,

    /// Outcome of `StartDevice`.
    pub start_status: StackStatus,

    /// Answer `Leave` with a confirm.
    pub leave_confirm: bool,

    pub responders: Vec<Responder>,

    /// Outcome of successive binds. Empty means success.
    pub bind_results: VecDeque<StackStatus>,

    pub targets: Vec<ScriptedTarget>,

    network: Option<NetworkInfo>,
    saved: Option<NetworkInfo>,
    channel: Option<Channel>,
}

impl Default for ScriptedStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedStack {
    /// An empty radio environment: nothing to join, nobody to bind to.
    pub fn new() -> Self {
        Self {
            latency: Duration::from_millis(10),
            networks: Vec::new(),
            join_results: VecDeque::new(),
            trust_center: None,
            assigned_address: NetworkAddress(0x4F21),
            energies: Vec::new(),
            formation_status: StackStatus::Success,
            start_status: StackStatus::Success,
            leave_confirm: true,
            responders: Vec::new(),
            bind_results: VecDeque::new(),
            targets: Vec::new(),
            network: None,
            saved: None,
            channel: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_network(mut self, network: NetworkDescriptor) -> Self {
        self.networks.push(network);
        self
    }

    pub fn with_join_results(mut self, results: impl IntoIterator<Item = StackStatus>) -> Self {
        self.join_results = results.into_iter().collect();
        self
    }

    pub fn with_trust_center(mut self, trust_center: TrustCenterScript) -> Self {
        self.trust_center = Some(trust_center);
        self
    }

    pub fn with_energies(mut self, energies: Vec<(Channel, u8)>) -> Self {
        self.energies = energies;
        self
    }

    pub fn with_formation_status(mut self, status: StackStatus) -> Self {
        self.formation_status = status;
        self
    }

    pub fn with_start_status(mut self, status: StackStatus) -> Self {
        self.start_status = status;
        self
    }

    pub fn without_leave_confirm(mut self) -> Self {
        self.leave_confirm = false;
        self
    }

    pub fn with_responder(mut self, responder: Responder) -> Self {
        self.responders.push(responder);
        self
    }

    pub fn with_bind_results(mut self, results: impl IntoIterator<Item = StackStatus>) -> Self {
        self.bind_results = results.into_iter().collect();
        self
    }

    pub fn with_target(mut self, target: ScriptedTarget) -> Self {
        self.targets.push(target);
        self
    }

    /// Network data already in non-volatile storage.
    pub fn with_persisted_network(mut self, network: NetworkInfo) -> Self {
        self.saved = Some(network);
        self
    }

    /// The network the radio currently operates on.
    pub fn network(&self) -> Option<NetworkInfo> {
        self.network
    }

    /// The network in non-volatile storage.
    pub fn saved_network(&self) -> Option<NetworkInfo> {
        self.saved
    }

    /// Channel set outside of any network.
    pub fn channel(&self) -> Option<Channel> {
        self.channel
    }

    fn reply(&self, event: Event) -> Vec<StackReply> {
        vec![StackReply::new(self.latency, event)]
    }

    fn joined(&self, network: &NetworkDescriptor) -> NetworkInfo {
        NetworkInfo {
            pan_id: network.pan_id,
            extended_pan_id: network.extended_pan_id,
            channel: network.channel,
            network_address: self.assigned_address,
            network_type: if self.trust_center.is_some() {
                NetworkType::Centralized
            } else {
                NetworkType::Distributed
            },
        }
    }

    fn on_join(&mut self, network: &NetworkDescriptor) -> Vec<StackReply> {
        let status = self.join_results.pop_front().unwrap_or(StackStatus::Success);
        if !status.is_success() {
            debug!(%status, extended_pan_id = %network.extended_pan_id, "Scripted join failure");
            return self.reply(Event::JoinConfirm {
                status,
                network: None,
                trust_center: None,
            });
        }
        let info = self.joined(network);
        self.network = Some(info);
        self.reply(Event::JoinConfirm {
            status,
            network: Some(info),
            trust_center: self.trust_center.map(|tc| tc.address),
        })
    }

    fn on_form(&mut self, first: Option<Channel>, network_type: NetworkType) -> Vec<StackReply> {
        let channel = match first {
            Some(channel) if self.formation_status.is_success() => channel,
            _ => {
                return self.reply(Event::FormationConfirm {
                    status: if self.formation_status.is_success() {
                        StackStatus::Failure
                    } else {
                        self.formation_status
                    },
                    network: None,
                });
            }
        };
        let info = NetworkInfo {
            pan_id: FORMED_PAN_ID,
            extended_pan_id: FORMED_EXTENDED_PAN_ID,
            channel,
            network_address: NetworkAddress::COORDINATOR,
            network_type,
        };
        self.network = Some(info);
        self.reply(Event::FormationConfirm {
            status: StackStatus::Success,
            network: Some(info),
        })
    }

    fn responder(&self, address: NetworkAddress) -> Option<&Responder> {
        self.responders.iter().find(|r| r.address == address)
    }
}

impl NetworkStack for ScriptedStack {
    fn submit(&mut self, _now: Duration, request: &StackRequest) -> Vec<StackReply> {
        trace!(request = request.type_name(), "Scripted stack request");

        match request {
            StackRequest::SetChannel { channel } => {
                self.channel = Some(*channel);
                vec![]
            }
            StackRequest::SaveNetworkInfo => {
                self.saved = self.network;
                vec![]
            }
            StackRequest::ResetToFactoryNew => {
                self.saved = None;
                self.network = None;
                vec![]
            }
            StackRequest::StartDevice { .. } => {
                if self.start_status.is_success() {
                    self.network = self.saved;
                }
                self.reply(Event::StartDeviceConfirm {
                    status: self.start_status,
                    network: self.saved,
                })
            }
            StackRequest::Leave { .. } => {
                self.network = None;
                if !self.leave_confirm {
                    return vec![];
                }
                self.reply(Event::LeaveConfirm {
                    status: StackStatus::Success,
                })
            }
            StackRequest::JoinFixedNetwork { network, .. } => {
                self.network = Some(*network);
                self.reply(Event::StartDeviceConfirm {
                    status: StackStatus::Success,
                    network: Some(*network),
                })
            }

            StackRequest::NetworkDiscovery { channels, .. } => {
                let networks = self
                    .networks
                    .iter()
                    .filter(|n| channels.contains(n.channel))
                    .copied()
                    .collect();
                self.reply(Event::NetworkDiscoveryConfirm {
                    status: StackStatus::Success,
                    networks,
                })
            }
            StackRequest::Associate { network } | StackRequest::Rejoin { network } => {
                self.on_join(network)
            }

            StackRequest::NodeDescriptorRequest { destination } => match self.trust_center {
                Some(tc) => self.reply(Event::NodeDescriptorResponse {
                    status: StackStatus::Success,
                    source: *destination,
                    server_mask: u16::from(tc.stack_revision) << 9,
                }),
                None => vec![],
            },
            StackRequest::RequestTcLinkKey { .. } | StackRequest::KeyEstablishment { .. } => {
                match self.trust_center {
                    Some(TrustCenterScript {
                        address,
                        key: Some(key),
                        ..
                    }) => self.reply(Event::TcLinkKeyReceived {
                        trust_center: address,
                        key,
                    }),
                    _ => vec![],
                }
            }
            StackRequest::VerifyKey { .. } => {
                let status = self
                    .trust_center
                    .map_or(StackStatus::Failure, |tc| tc.verify_status);
                self.reply(Event::VerifyKeyConfirm { status })
            }

            StackRequest::EnergyScan { channels, .. } => {
                let energies = self
                    .energies
                    .iter()
                    .filter(|(channel, _)| channels.contains(*channel))
                    .copied()
                    .collect();
                self.reply(Event::EnergyScanConfirm {
                    status: StackStatus::Success,
                    energies,
                })
            }
            StackRequest::FormNetwork {
                channels,
                network_type,
                ..
            } => self.on_form(channels.first(), *network_type),

            StackRequest::TouchlinkScanRequest {
                channel,
                transaction_id,
                ..
            } => self
                .targets
                .iter()
                .filter(|t| t.channel == *channel)
                .map(|t| {
                    StackReply::new(
                        self.latency,
                        Event::TouchlinkScanResponseReceived {
                            response: ScanResponse {
                                transaction_id: *transaction_id,
                                ..t.response
                            },
                        },
                    )
                })
                .collect(),
            StackRequest::TouchlinkNetworkRequest {
                target,
                transaction_id,
                params,
                ..
            } => match self.targets.iter().find(|t| t.response.source == *target) {
                Some(t) => self.reply(Event::TouchlinkNetworkResponseReceived {
                    source: *target,
                    transaction_id: *transaction_id,
                    success: t.accept_network,
                    params: Some(*params),
                }),
                None => vec![],
            },
            StackRequest::TouchlinkApplyNetwork { params } => {
                let info = NetworkInfo {
                    pan_id: params.pan_id,
                    extended_pan_id: params.extended_pan_id,
                    channel: params.channel,
                    network_address: params.network_address,
                    network_type: NetworkType::Distributed,
                };
                self.network = Some(info);
                self.reply(Event::StartDeviceConfirm {
                    status: StackStatus::Success,
                    network: Some(info),
                })
            }

            StackRequest::IdentifyQuery { .. } => self
                .responders
                .iter()
                .map(|r| {
                    StackReply::new(
                        self.latency,
                        Event::IdentifyQueryResponse {
                            source: r.address,
                            endpoint: r.endpoint,
                            timeout: r.identify_time,
                        },
                    )
                })
                .collect(),
            StackRequest::SimpleDescriptorRequest { destination, .. } => {
                match self.responder(*destination).and_then(|r| r.descriptor.clone()) {
                    Some(descriptor) => self.reply(Event::SimpleDescriptorResponse {
                        status: StackStatus::Success,
                        source: *destination,
                        descriptor: Some(descriptor),
                    }),
                    None => vec![],
                }
            }
            StackRequest::IeeeAddressRequest { destination } => match self.responder(*destination) {
                Some(r) => self.reply(Event::IeeeAddressResponse {
                    status: StackStatus::Success,
                    source: *destination,
                    ieee: r.ieee,
                }),
                None => vec![],
            },
            StackRequest::Bind { .. } => {
                let status = self.bind_results.pop_front().unwrap_or(StackStatus::Success);
                self.reply(Event::BindConfirm { status })
            }

            StackRequest::ConfigureSecurity { .. }
            | StackRequest::ConfigureScan { .. }
            | StackRequest::MgmtPermitJoin { .. }
            | StackRequest::LocalPermitJoin { .. }
            | StackRequest::InstallTcLinkKey { .. }
            | StackRequest::TouchlinkScanResponse { .. }
            | StackRequest::TouchlinkIdentify { .. }
            | StackRequest::TouchlinkNetworkResponse { .. }
            | StackRequest::IdentifyQueryResponse { .. }
            | StackRequest::Identify { .. }
            | StackRequest::AddGroup { .. }
            | StackRequest::ConfigureReporting(_) => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdb_types::ChannelMask;

    fn beacon(channel: u8) -> NetworkDescriptor {
        NetworkDescriptor {
            pan_id: PanId(0x2222),
            extended_pan_id: ExtendedPanId(0xABCD),
            channel: Channel(channel),
            permit_joining: true,
            lqi: 200,
        }
    }

    #[test]
    fn test_discovery_filters_by_channel() {
        let mut stack = ScriptedStack::new().with_network(beacon(15)).with_network(beacon(12));
        let replies = stack.submit(
            Duration::ZERO,
            &StackRequest::NetworkDiscovery {
                channels: ChannelMask::TOUCHLINK_PRIMARY,
                duration: 3,
            },
        );
        assert_eq!(
            replies,
            vec![StackReply::new(
                Duration::from_millis(10),
                Event::NetworkDiscoveryConfirm {
                    status: StackStatus::Success,
                    networks: vec![beacon(15)],
                }
            )]
        );
    }

    #[test]
    fn test_join_results_are_consumed_in_order() {
        let mut stack = ScriptedStack::new().with_join_results([StackStatus::Failure]);
        let request = StackRequest::Associate { network: beacon(15) };

        let first = stack.submit(Duration::ZERO, &request);
        assert!(matches!(
            first[0].event,
            Event::JoinConfirm {
                status: StackStatus::Failure,
                network: None,
                ..
            }
        ));
        let second = stack.submit(Duration::ZERO, &request);
        assert!(matches!(
            second[0].event,
            Event::JoinConfirm {
                status: StackStatus::Success,
                network: Some(_),
                trust_center: None,
            }
        ));
        assert_eq!(stack.network().map(|n| n.channel), Some(Channel(15)));
    }

    #[test]
    fn test_saved_network_survives_until_factory_reset() {
        let mut stack = ScriptedStack::new();
        stack.submit(Duration::ZERO, &StackRequest::Associate { network: beacon(20) });
        stack.submit(Duration::ZERO, &StackRequest::SaveNetworkInfo);
        assert!(stack.saved_network().is_some());

        stack.submit(Duration::ZERO, &StackRequest::ResetToFactoryNew);
        assert!(stack.saved_network().is_none());
        assert!(stack.network().is_none());
    }
}
