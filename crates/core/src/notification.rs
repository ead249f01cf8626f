//! Application callbacks.

use bdb_types::{CommissioningDetail, Endpoint, FindBindDestination, NetworkAddress, TerminalStatus};

/// Callbacks delivered to the application.
///
/// Each is emitted at most once per logical event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Init finished.
    Init { success: bool, joined_network: bool },

    /// A commissioning procedure produced a result.
    Commissioning {
        status: TerminalStatus,
        detail: Option<CommissioningDetail>,
    },

    /// Identify time changed on a local endpoint.
    Identify {
        endpoint: Endpoint,
        source: NetworkAddress,
        identify_time: u16,
    },

    /// All matching clusters were bound to this destination.
    FindBindSuccess { destination: FindBindDestination },
}

impl Notification {
    /// Get a human-readable name for this notification type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Notification::Init { .. } => "Init",
            Notification::Commissioning { .. } => "Commissioning",
            Notification::Identify { .. } => "Identify",
            Notification::FindBindSuccess { .. } => "FindBindSuccess",
        }
    }

    /// The status of a commissioning report, if this is one.
    pub fn commissioning_status(&self) -> Option<TerminalStatus> {
        match self {
            Notification::Commissioning { status, .. } => Some(*status),
            _ => None,
        }
    }
}
