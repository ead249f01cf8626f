//! Network formation state machine.

use crate::FormationConfig;
use bdb_core::{Action, Event, Notification, StackRequest};
use bdb_types::{
    Channel, ChannelMask, CommissioningAttributes, DeviceType, LinkKey, NetworkAddress,
    NetworkInfo, StackStatus, TerminalStatus, KEY_LEN,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// Single channel chosen by the application.
    Forced,
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    EnergyScanning,
    Forming { pass: Pass },
    /// PAN is up; waiting for the controller to run the permit-join step.
    Formed,
}

/// Network formation sub-state machine.
pub struct NetworkFormation {
    config: FormationConfig,

    device_type: DeviceType,

    phase: Phase,

    /// Channel set by the application, bypassing the channel sets and energy scan.
    forced_channel: Option<Channel>,

    /// Source of fresh network keys.
    rng: ChaCha8Rng,

    now: Duration,
}

impl NetworkFormation {
    pub fn new(config: FormationConfig, device_type: DeviceType, seed: u64) -> Self {
        Self {
            config,
            device_type,
            phase: Phase::Idle,
            forced_channel: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
            now: Duration::ZERO,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Public API
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    /// Form on this channel only, or clear the override.
    pub fn set_channel(&mut self, channel: Option<Channel>) {
        self.forced_channel = channel;
    }

    pub fn forced_channel(&self) -> Option<Channel> {
        self.forced_channel
    }

    /// Check if a formation attempt is running.
    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Drop the attempt in progress.
    pub fn abort(&mut self) {
        if self.phase != Phase::Idle {
            debug!(phase = ?self.phase, "Aborting network formation");
            self.phase = Phase::Idle;
        }
    }

    /// Begin formation.
    pub fn start(&mut self, attrs: &mut CommissioningAttributes) -> Vec<Action> {
        if !self.device_type.can_form_network() {
            warn!(device_type = ?self.device_type, "Device type cannot form a network");
            return self.finish(TerminalStatus::FormationFailure);
        }

        if let Some(channel) = self.forced_channel {
            return self.form(attrs, Pass::Forced, ChannelMask::single(channel));
        }

        if !attrs.primary_channel_set.is_empty() {
            if self.config.energy_scan {
                debug!(channels = %attrs.primary_channel_set, "Scanning channel energy");
                self.phase = Phase::EnergyScanning;
                return vec![Action::Stack(StackRequest::EnergyScan {
                    channels: attrs.primary_channel_set,
                    duration: attrs.scan_duration,
                })];
            }
            return self.form(attrs, Pass::Primary, attrs.primary_channel_set);
        }

        if !attrs.secondary_channel_set.is_empty() {
            return self.form(attrs, Pass::Secondary, attrs.secondary_channel_set);
        }

        warn!("No channels configured for formation");
        self.finish(TerminalStatus::FormationFailure)
    }

    /// Energy detected per channel.
    pub fn on_energy_scan_confirm(
        &mut self,
        attrs: &mut CommissioningAttributes,
        status: StackStatus,
        energies: Vec<(Channel, u8)>,
    ) -> Vec<Action> {
        if self.phase != Phase::EnergyScanning {
            debug!(phase = ?self.phase, "Ignoring stale energy scan confirm");
            return vec![];
        }

        let primary = attrs.primary_channel_set;
        let quietest = if status.is_success() {
            energies
                .iter()
                .filter(|(channel, _)| primary.contains(*channel))
                .min_by_key(|(_, energy)| *energy)
                .map(|(channel, _)| *channel)
        } else {
            warn!(%status, "Energy scan failed");
            None
        };

        match quietest {
            Some(channel) => {
                debug!(%channel, "Quietest primary channel");
                self.form(attrs, Pass::Primary, ChannelMask::single(channel))
            }
            None => self.form(attrs, Pass::Primary, primary),
        }
    }

    /// Outcome of `FormNetwork`.
    pub fn on_formation_confirm(
        &mut self,
        attrs: &mut CommissioningAttributes,
        status: StackStatus,
        network: Option<NetworkInfo>,
    ) -> Vec<Action> {
        let Phase::Forming { pass } = self.phase else {
            debug!(phase = ?self.phase, "Ignoring stale formation confirm");
            return vec![];
        };

        if status.is_success() {
            attrs.node_is_on_a_network = true;
            self.phase = Phase::Formed;
            if let Some(network) = network {
                info!(
                    pan_id = %network.pan_id,
                    extended_pan_id = %network.extended_pan_id,
                    channel = %network.channel,
                    network_type = ?network.network_type,
                    "Formed network"
                );
            }
            return vec![
                Action::Notify(Notification::Commissioning {
                    status: TerminalStatus::FormationDone,
                    detail: None,
                }),
                Action::EnqueueInternal {
                    event: Event::NetworkFormationPermitJoin,
                },
            ];
        }

        if pass == Pass::Primary && !attrs.secondary_channel_set.is_empty() {
            warn!(%status, "Formation on primary channels failed, trying secondary");
            return self.form(attrs, Pass::Secondary, attrs.secondary_channel_set);
        }

        warn!(%status, ?pass, "Formation failed");
        self.finish(TerminalStatus::FormationFailure)
    }

    /// Open the new network for joiners and finish.
    pub fn on_permit_join(&mut self) -> Vec<Action> {
        if self.phase != Phase::Formed {
            debug!(phase = ?self.phase, "Ignoring permit-join outside of formation");
            return vec![];
        }

        let duration = self.config.permit_join_duration;
        let mut actions = vec![
            Action::Stack(StackRequest::MgmtPermitJoin {
                destination: NetworkAddress::BROADCAST_ROUTERS,
                duration,
            }),
            Action::Stack(StackRequest::LocalPermitJoin { duration }),
            Action::Stack(StackRequest::SaveNetworkInfo),
        ];
        actions.extend(self.finish(TerminalStatus::Success));
        actions
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Internals
    // ═══════════════════════════════════════════════════════════════════════════

    fn form(
        &mut self,
        attrs: &CommissioningAttributes,
        pass: Pass,
        channels: ChannelMask,
    ) -> Vec<Action> {
        let network_type = self.device_type.formed_network_type();
        debug!(?pass, %channels, ?network_type, "Forming network");
        self.phase = Phase::Forming { pass };
        vec![Action::Stack(StackRequest::FormNetwork {
            channels,
            duration: attrs.scan_duration,
            network_key: self.fresh_network_key(),
            network_type,
        })]
    }

    fn fresh_network_key(&mut self) -> LinkKey {
        let mut key = [0u8; KEY_LEN];
        self.rng.fill(&mut key[..]);
        LinkKey(key)
    }

    fn finish(&mut self, status: TerminalStatus) -> Vec<Action> {
        self.phase = Phase::Idle;
        vec![Action::EnqueueInternal {
            event: Event::NetworkFormationFinished { status },
        }]
    }
}
