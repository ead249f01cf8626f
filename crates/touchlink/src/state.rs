//! Touchlink state shared by both roles.

use crate::TouchlinkConfig;
use bdb_core::{Action, Event, StackRequest, TimerId};
use bdb_types::{
    Channel, CommissioningAttributes, CommissioningSettings, DeviceType, ExtendedAddress,
    KeyScope, NetworkInfo, NetworkType, ScanResponse, StackStatus, TerminalStatus,
    TouchlinkNetworkParams, TL_KEY_BITMASK_CERTIFICATION, TL_KEY_BITMASK_MASTER,
};
use indexmap::IndexMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tracing::{debug, info, warn};

/// An inter-PAN transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Transaction {
    pub id: u32,
    pub started_at: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Phase {
    Idle,

    // Initiator
    Scanning {
        plan: Vec<Channel>,
        index: usize,
        extended: bool,
    },
    AwaitingNetworkResponse {
        target: ExtendedAddress,
        /// Parameters this node applies after the startup delay; `None` when it stays on its network.
        own: Option<TouchlinkNetworkParams>,
    },
    StartupDelay {
        own: Option<TouchlinkNetworkParams>,
    },
    Applying,

    // Target
    Listening {
        initiator: ExtendedAddress,
    },
    TargetApplying,
}

impl Phase {
    pub(crate) fn is_target(&self) -> bool {
        matches!(self, Phase::Listening { .. } | Phase::TargetApplying)
    }
}

/// Touchlink sub-state machine.
pub struct Touchlink {
    pub(crate) config: TouchlinkConfig,

    pub(crate) device_type: DeviceType,

    /// This node's extended address.
    pub(crate) local: ExtendedAddress,

    /// Target listening enabled by the commissioning settings.
    pub(crate) enabled: bool,

    pub(crate) lqi_threshold: u8,

    /// Key bitmask advertised and accepted.
    pub(crate) key_bitmask: u16,

    pub(crate) phase: Phase,

    pub(crate) transaction: Option<Transaction>,

    /// Valid scan responses, one per target, in arrival order.
    pub(crate) responses: IndexMap<ExtendedAddress, ScanResponse>,

    pub(crate) factory_new: bool,

    /// Network this node is on, if any.
    pub(crate) network: Option<NetworkInfo>,

    pub(crate) rng: ChaCha8Rng,

    pub(crate) now: Duration,
}

impl Touchlink {
    pub fn new(
        config: TouchlinkConfig,
        device_type: DeviceType,
        local: ExtendedAddress,
        seed: u64,
    ) -> Self {
        Self {
            config,
            device_type,
            local,
            enabled: false,
            lqi_threshold: 0,
            key_bitmask: TL_KEY_BITMASK_CERTIFICATION,
            phase: Phase::Idle,
            transaction: None,
            responses: IndexMap::new(),
            factory_new: true,
            network: None,
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

    /// Apply the touchlink part of the commissioning settings.
    pub fn configure(&mut self, settings: &CommissioningSettings) {
        self.enabled = settings.touchlink_enabled;
        self.lqi_threshold = settings.touchlink_lqi_threshold;
        self.key_bitmask = match settings.link_keys.touchlink.scope {
            KeyScope::Master => TL_KEY_BITMASK_MASTER,
            _ => TL_KEY_BITMASK_CERTIFICATION,
        };
        debug!(
            enabled = self.enabled,
            lqi_threshold = self.lqi_threshold,
            key_bitmask = self.key_bitmask,
            "Touchlink configured"
        );
    }

    /// Check if this node answers scan requests.
    pub fn is_target_enabled(&self) -> bool {
        self.enabled
    }

    /// Check if either role is running.
    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Check if the target role is running.
    pub fn is_target_active(&self) -> bool {
        self.phase.is_target()
    }

    /// Drop whatever is in progress.
    pub fn abort(&mut self) -> Vec<Action> {
        if self.phase == Phase::Idle {
            return vec![];
        }
        debug!(phase = ?self.phase, "Aborting touchlink");
        self.reset();
        vec![Action::CancelTimer {
            id: TimerId::Touchlink,
        }]
    }

    /// Touchlink timer expired.
    pub fn on_timer(&mut self) -> Vec<Action> {
        match &self.phase {
            Phase::Idle | Phase::Applying | Phase::TargetApplying => {
                debug!(phase = ?self.phase, "Ignoring stale touchlink timer");
                vec![]
            }
            Phase::Scanning { .. } => self.on_scan_timer(),
            Phase::AwaitingNetworkResponse { target, .. } => {
                warn!(%target, "No network response within transaction lifetime");
                self.finish(TerminalStatus::TargetFailure)
            }
            Phase::StartupDelay { own } => match *own {
                Some(params) => {
                    debug!(channel = %params.channel, "Startup delay over, joining new network");
                    self.phase = Phase::Applying;
                    vec![Action::Stack(StackRequest::TouchlinkApplyNetwork { params })]
                }
                None => self.finish(TerminalStatus::Success),
            },
            Phase::Listening { .. } => self.on_rx_window_expired(),
        }
    }

    /// The stack started (or failed to start) on the touchlinked network.
    pub fn on_start_device_confirm(
        &mut self,
        attrs: &mut CommissioningAttributes,
        status: StackStatus,
        network: Option<NetworkInfo>,
    ) -> Vec<Action> {
        if !matches!(self.phase, Phase::Applying | Phase::TargetApplying) {
            debug!(phase = ?self.phase, "Ignoring start confirm outside of touchlink");
            return vec![];
        }

        if !status.is_success() {
            warn!(%status, "Failed to start on touchlinked network");
            let terminal = if self.phase == Phase::TargetApplying && !self.factory_new {
                TerminalStatus::Success
            } else {
                TerminalStatus::TargetFailure
            };
            return self.finish(terminal);
        }

        attrs.node_is_on_a_network = true;
        self.factory_new = false;
        self.network = network.map(|n| NetworkInfo {
            network_type: NetworkType::Distributed,
            ..n
        });
        if let Some(n) = &self.network {
            info!(
                extended_pan_id = %n.extended_pan_id,
                channel = %n.channel,
                address = %n.network_address,
                "Touchlinked onto network"
            );
        }

        let mut actions = vec![Action::Stack(StackRequest::SaveNetworkInfo)];
        actions.extend(self.finish(TerminalStatus::Success));
        actions
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Shared Internals
    // ═══════════════════════════════════════════════════════════════════════════

    /// Age of the current transaction, if one is open.
    pub(crate) fn transaction_age(&self) -> Option<Duration> {
        self.transaction
            .map(|t| self.now.saturating_sub(t.started_at))
    }

    pub(crate) fn transaction_expired(&self) -> bool {
        self.transaction_age()
            .map_or(true, |age| age > self.config.transaction_lifetime)
    }

    /// A random non-zero identifier.
    pub(crate) fn fresh_id(&mut self) -> u32 {
        self.rng.gen_range(1..=u32::MAX)
    }

    pub(crate) fn finish(&mut self, status: TerminalStatus) -> Vec<Action> {
        info!(%status, target = self.phase.is_target(), "Touchlink finished");
        self.reset();
        vec![
            Action::CancelTimer {
                id: TimerId::Touchlink,
            },
            Action::EnqueueInternal {
                event: Event::TouchlinkFinished { status },
            },
        ]
    }

    fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.transaction = None;
        self.responses.clear();
    }
}
