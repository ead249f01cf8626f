//! Commissioning context: controller state and per-boot bookkeeping.

use bdb_types::{
    Channel, CommissioningDetail, CommissioningRole, ExtendedAddress, NetworkInfo, TerminalStatus,
};
use std::fmt;

/// Top-level commissioning state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BdbState {
    #[default]
    Idle,
    /// Waiting for the stack to come up after init.
    Init,
    CommissioningTouchlink,
    CommissioningNetworkSteer,
    CommissioningNetworkFormation,
    CommissioningFindOrBind,
    /// A factory reset is leaving the network.
    CommissioningBusy,
    /// A direct join is waiting for its start confirm.
    DirectJoin,
    /// An unsolicited rejoin result is being reported.
    RejoinDone,
}

impl fmt::Display for BdbState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// What the application knows about the node when it calls init.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootInfo {
    /// No persisted network data.
    pub factory_new: bool,

    /// False on a retention wake-up: keys and frame counters are kept.
    pub cold_start: bool,

    /// The persisted network, for a node that is not factory new.
    pub network: Option<NetworkInfo>,
}

impl BootInfo {
    /// A node straight out of the factory.
    pub fn factory_new() -> Self {
        Self {
            factory_new: true,
            cold_start: true,
            network: None,
        }
    }

    /// A node restarting on a persisted network.
    pub fn on_network(network: NetworkInfo, cold_start: bool) -> Self {
        Self {
            factory_new: false,
            cold_start,
            network: Some(network),
        }
    }
}

/// Commissioning context owned by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommissioningContext {
    pub state: BdbState,

    /// Role of the current two-party procedure.
    pub role: CommissioningRole,

    /// Status the next confirm reports.
    pub status: TerminalStatus,

    /// Argument the next confirm reports.
    pub detail: Option<CommissioningDetail>,

    pub factory_new: bool,

    /// `init` has been called.
    pub initialized: bool,

    /// Operating channel recorded at the last successful confirm.
    pub channel: Option<Channel>,

    /// The network the node is on.
    pub network: Option<NetworkInfo>,

    pub trust_center: Option<ExtendedAddress>,

    /// A factory reset is waiting for its leave confirm.
    pub leave_in_progress: bool,

    /// A direct join is outstanding.
    pub force_join: bool,

    /// Join and form without network security.
    pub security_disabled: bool,
}

impl Default for CommissioningContext {
    fn default() -> Self {
        Self {
            state: BdbState::Idle,
            role: CommissioningRole::None,
            status: TerminalStatus::Success,
            detail: None,
            factory_new: true,
            initialized: false,
            channel: None,
            network: None,
            trust_center: None,
            leave_in_progress: false,
            force_join: false,
            security_disabled: false,
        }
    }
}
