//! Network steering state machine.

use crate::SteeringConfig;
use bdb_core::{Action, Event, StackRequest, TimerId};
use bdb_types::{
    ChannelMask, CommissioningAttributes, CommissioningDetail, DeviceType, ExtendedAddress,
    ExtendedPanId, NetworkAddress, NetworkDescriptor, NetworkInfo, NetworkType, StackStatus,
    TerminalStatus,
};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanPass {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Idle,
    Discovering {
        pass: ScanPass,
    },
    Joining {
        network: NetworkDescriptor,
        attempt: u8,
        rejoin: bool,
    },
    /// Joined; waiting out the settle delay before the next step.
    Settling {
        exchange_tc_link_key: bool,
    },
    /// Waiting for the controller to run the permit-join step.
    Joined,
}

/// Network steering sub-state machine.
///
/// Owns no attributes: every handler borrows the controller's
/// [`CommissioningAttributes`] for the duration of the call.
pub struct NetworkSteering {
    config: SteeringConfig,

    /// Local permit-join is skipped on end devices.
    device_type: DeviceType,

    phase: Phase,

    /// Whether network-layer security is on; without it there is no TC link key to fetch.
    security_enabled: bool,

    /// Network the node was last on. Seeing it again means rejoin, not associate.
    previous_network: Option<ExtendedPanId>,

    now: Duration,
}

impl NetworkSteering {
    pub fn new(config: SteeringConfig, device_type: DeviceType) -> Self {
        Self {
            config,
            device_type,
            phase: Phase::Idle,
            security_enabled: true,
            previous_network: None,
            now: Duration::ZERO,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Public API
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    pub fn set_security_enabled(&mut self, enabled: bool) {
        self.security_enabled = enabled;
    }

    /// Remember the network the node was last on.
    pub fn remember_network(&mut self, network: Option<ExtendedPanId>) {
        self.previous_network = network;
    }

    /// Check if a steering attempt is running.
    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Drop any attempt in progress.
    pub fn abort(&mut self) -> Vec<Action> {
        if self.phase == Phase::Idle {
            return vec![];
        }
        debug!(phase = ?self.phase, "Aborting network steering");
        self.phase = Phase::Idle;
        vec![Action::CancelTimer {
            id: TimerId::Steering,
        }]
    }

    /// Begin steering.
    pub fn start(&mut self, attrs: &mut CommissioningAttributes) -> Vec<Action> {
        if attrs.node_is_on_a_network {
            info!("Already on a network, steering opens it for joiners");
            self.phase = Phase::Joined;
            return vec![Action::EnqueueInternal {
                event: Event::NetworkSteerPermitJoin,
            }];
        }

        if !attrs.primary_channel_set.is_empty() {
            self.discover(attrs, ScanPass::Primary, attrs.primary_channel_set)
        } else if !attrs.secondary_channel_set.is_empty() {
            self.discover(attrs, ScanPass::Secondary, attrs.secondary_channel_set)
        } else {
            warn!("No channels configured for steering");
            self.finish(TerminalStatus::NoNetwork, None)
        }
    }

    /// Beacons collected on the current pass.
    pub fn on_discovery_confirm(
        &mut self,
        attrs: &mut CommissioningAttributes,
        status: StackStatus,
        networks: Vec<NetworkDescriptor>,
    ) -> Vec<Action> {
        let pass = match self.phase {
            Phase::Discovering { pass } => pass,
            _ => {
                debug!(phase = ?self.phase, "Ignoring stale discovery confirm");
                return vec![];
            }
        };

        if !status.is_success() {
            warn!(%status, ?pass, "Network discovery failed");
        }

        let candidate = if status.is_success() {
            self.select_network(&networks)
        } else {
            None
        };

        match candidate {
            Some((network, rejoin)) => {
                info!(
                    pan_id = %network.pan_id,
                    extended_pan_id = %network.extended_pan_id,
                    channel = %network.channel,
                    lqi = network.lqi,
                    rejoin,
                    "Selected network"
                );
                self.phase = Phase::Joining {
                    network,
                    attempt: 1,
                    rejoin,
                };
                vec![Action::Stack(Self::join_request(network, rejoin))]
            }
            None if pass == ScanPass::Primary && !attrs.secondary_channel_set.is_empty() => {
                debug!(
                    found = networks.len(),
                    "No joinable network on primary channels"
                );
                self.discover(attrs, ScanPass::Secondary, attrs.secondary_channel_set)
            }
            None => {
                info!(found = networks.len(), "No joinable network found");
                self.finish(TerminalStatus::NoNetwork, None)
            }
        }
    }

    /// Outcome of an `Associate` or `Rejoin`.
    pub fn on_join_confirm(
        &mut self,
        attrs: &mut CommissioningAttributes,
        status: StackStatus,
        network: Option<NetworkInfo>,
        trust_center: Option<ExtendedAddress>,
    ) -> Vec<Action> {
        let (target, attempt, rejoin) = match self.phase {
            Phase::Joining {
                network,
                attempt,
                rejoin,
            } => (network, attempt, rejoin),
            _ => {
                debug!(phase = ?self.phase, "Ignoring stale join confirm");
                return vec![];
            }
        };

        if status.is_success() {
            attrs.node_is_on_a_network = true;
            self.previous_network = Some(target.extended_pan_id);

            let centralized = trust_center.is_some()
                || network.map(|n| n.network_type) == Some(NetworkType::Centralized);
            let exchange_tc_link_key = centralized
                && self.security_enabled
                && !attrs.node_join_link_key_type.skips_tc_key_exchange();

            info!(
                extended_pan_id = %target.extended_pan_id,
                attempt,
                centralized,
                exchange_tc_link_key,
                "Joined network"
            );
            self.phase = Phase::Settling {
                exchange_tc_link_key,
            };
            return vec![Action::SetTimer {
                id: TimerId::Steering,
                duration: self.config.join_settle_delay,
            }];
        }

        if attempt < self.config.retry_limit() {
            warn!(
                %status,
                attempt,
                limit = self.config.retry_limit(),
                "Join failed, retrying same network"
            );
            self.phase = Phase::Joining {
                network: target,
                attempt: attempt + 1,
                rejoin,
            };
            return vec![Action::Stack(Self::join_request(target, rejoin))];
        }

        warn!(%status, attempt, rejoin, "Join failed, retries exhausted");
        let terminal = if rejoin {
            TerminalStatus::RejoinFailure
        } else {
            TerminalStatus::NoNetwork
        };
        self.finish(terminal, Some(CommissioningDetail::JoinFailure(status)))
    }

    /// Steering timer expired.
    pub fn on_timer(&mut self) -> Vec<Action> {
        let Phase::Settling {
            exchange_tc_link_key,
        } = self.phase
        else {
            debug!(phase = ?self.phase, "Ignoring stale steering timer");
            return vec![];
        };

        self.phase = Phase::Joined;
        let event = if exchange_tc_link_key {
            Event::NetworkSteerRetrieveTcLinkKey
        } else {
            Event::NetworkSteerPermitJoin
        };
        vec![Action::EnqueueInternal { event }]
    }

    /// Open the network for joiners and finish.
    pub fn on_permit_join(&mut self) -> Vec<Action> {
        if self.phase != Phase::Joined {
            debug!(phase = ?self.phase, "Ignoring permit-join outside of steering");
            return vec![];
        }

        let duration = self.config.permit_join_duration;
        let mut actions = vec![Action::Stack(StackRequest::MgmtPermitJoin {
            destination: NetworkAddress::BROADCAST_ROUTERS,
            duration,
        })];
        if self.device_type != DeviceType::EndDevice {
            actions.push(Action::Stack(StackRequest::LocalPermitJoin { duration }));
        }
        actions.push(Action::Stack(StackRequest::SaveNetworkInfo));
        actions.extend(self.finish(TerminalStatus::Success, None));
        actions
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Internals
    // ═══════════════════════════════════════════════════════════════════════════

    fn discover(
        &mut self,
        attrs: &CommissioningAttributes,
        pass: ScanPass,
        channels: ChannelMask,
    ) -> Vec<Action> {
        debug!(?pass, %channels, "Starting network discovery");
        self.phase = Phase::Discovering { pass };
        vec![Action::Stack(StackRequest::NetworkDiscovery {
            channels,
            duration: attrs.scan_duration,
        })]
    }

    /// The previous network if it is beaconing, else the best-LQI network admitting joiners.
    fn select_network(&self, networks: &[NetworkDescriptor]) -> Option<(NetworkDescriptor, bool)> {
        if let Some(previous) = self.previous_network {
            if let Some(network) = networks
                .iter()
                .filter(|n| n.extended_pan_id == previous)
                .max_by_key(|n| n.lqi)
            {
                return Some((*network, true));
            }
        }
        networks
            .iter()
            .filter(|n| n.permit_joining)
            .max_by_key(|n| n.lqi)
            .map(|n| (*n, false))
    }

    fn join_request(network: NetworkDescriptor, rejoin: bool) -> StackRequest {
        if rejoin {
            StackRequest::Rejoin { network }
        } else {
            StackRequest::Associate { network }
        }
    }

    fn finish(
        &mut self,
        status: TerminalStatus,
        detail: Option<CommissioningDetail>,
    ) -> Vec<Action> {
        self.phase = Phase::Idle;
        vec![Action::EnqueueInternal {
            event: Event::NetworkSteerFinished { status, detail },
        }]
    }
}
