//! Commissioning result codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a commissioning attempt, as reported to the application.
///
/// Codes follow the `commissioningStatus` attribute encoding, with
/// `InProgress` (code 1) split off into [`CommissioningStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerminalStatus {
    Success,
    NotAddressAssignmentCapable,
    NoNetwork,
    TargetFailure,
    FormationFailure,
    NoIdentifyQueryResponse,
    BindingTableFull,
    NoScanResponse,
    NotPermitted,
    TclkExFailure,
    ParentLost,
    RejoinFailure,
    /// Informational: the PAN is up, permit-join and the final status follow.
    FormationDone,
}

impl TerminalStatus {
    /// Attribute encoding.
    pub fn code(self) -> u8 {
        match self {
            TerminalStatus::Success => 0,
            TerminalStatus::NotAddressAssignmentCapable => 2,
            TerminalStatus::NoNetwork => 3,
            TerminalStatus::TargetFailure => 4,
            TerminalStatus::FormationFailure => 5,
            TerminalStatus::NoIdentifyQueryResponse => 6,
            TerminalStatus::BindingTableFull => 7,
            TerminalStatus::NoScanResponse => 8,
            TerminalStatus::NotPermitted => 9,
            TerminalStatus::TclkExFailure => 10,
            TerminalStatus::ParentLost => 11,
            TerminalStatus::RejoinFailure => 12,
            TerminalStatus::FormationDone => 13,
        }
    }

    /// Decode from the attribute encoding.
    pub fn from_code(code: u8) -> Option<Self> {
        let status = match code {
            0 => TerminalStatus::Success,
            2 => TerminalStatus::NotAddressAssignmentCapable,
            3 => TerminalStatus::NoNetwork,
            4 => TerminalStatus::TargetFailure,
            5 => TerminalStatus::FormationFailure,
            6 => TerminalStatus::NoIdentifyQueryResponse,
            7 => TerminalStatus::BindingTableFull,
            8 => TerminalStatus::NoScanResponse,
            9 => TerminalStatus::NotPermitted,
            10 => TerminalStatus::TclkExFailure,
            11 => TerminalStatus::ParentLost,
            12 => TerminalStatus::RejoinFailure,
            13 => TerminalStatus::FormationDone,
            _ => return None,
        };
        Some(status)
    }

    pub fn is_success(self) -> bool {
        self == TerminalStatus::Success
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TerminalStatus::Success => "Success",
            TerminalStatus::NotAddressAssignmentCapable => "NotAddressAssignmentCapable",
            TerminalStatus::NoNetwork => "NoNetwork",
            TerminalStatus::TargetFailure => "TargetFailure",
            TerminalStatus::FormationFailure => "FormationFailure",
            TerminalStatus::NoIdentifyQueryResponse => "NoIdentifyQueryResponse",
            TerminalStatus::BindingTableFull => "BindingTableFull",
            TerminalStatus::NoScanResponse => "NoScanResponse",
            TerminalStatus::NotPermitted => "NotPermitted",
            TerminalStatus::TclkExFailure => "TclkExFailure",
            TerminalStatus::ParentLost => "ParentLost",
            TerminalStatus::RejoinFailure => "RejoinFailure",
            TerminalStatus::FormationDone => "FormationDone",
        }
    }
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of the `commissioningStatus` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommissioningStatus {
    /// A procedure is running; no result yet.
    InProgress,
    /// Last procedure finished with this result.
    Finished(TerminalStatus),
}

impl CommissioningStatus {
    pub const IN_PROGRESS_CODE: u8 = 1;

    pub fn code(self) -> u8 {
        match self {
            CommissioningStatus::InProgress => Self::IN_PROGRESS_CODE,
            CommissioningStatus::Finished(status) => status.code(),
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        if code == Self::IN_PROGRESS_CODE {
            Some(CommissioningStatus::InProgress)
        } else {
            TerminalStatus::from_code(code).map(CommissioningStatus::Finished)
        }
    }

    pub fn is_in_progress(self) -> bool {
        self == CommissioningStatus::InProgress
    }

    /// The terminal result, if the last procedure finished.
    pub fn terminal(self) -> Option<TerminalStatus> {
        match self {
            CommissioningStatus::InProgress => None,
            CommissioningStatus::Finished(status) => Some(status),
        }
    }
}

impl Default for CommissioningStatus {
    fn default() -> Self {
        CommissioningStatus::Finished(TerminalStatus::Success)
    }
}

impl fmt::Display for CommissioningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommissioningStatus::InProgress => write!(f, "InProgress"),
            CommissioningStatus::Finished(status) => write!(f, "{}", status),
        }
    }
}

/// Result code carried by confirms from the network stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StackStatus {
    Success,
    Failure,
    /// Association refused by the parent.
    NotPermitted,
    NoNetworks,
    /// Parent could not be reached during rejoin.
    NetworkLost,
    TableFull,
    Timeout,
    NoAck,
    InvalidParameter,
    SecurityFailure,
    NotSupported,
}

impl StackStatus {
    pub fn is_success(self) -> bool {
        self == StackStatus::Success
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Optional argument accompanying a commissioning report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommissioningDetail {
    /// The last join attempt failed with this stack status.
    JoinFailure(StackStatus),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_round_trip() {
        for code in 0..=13u8 {
            let status = CommissioningStatus::from_code(code).unwrap();
            assert_eq!(status.code(), code);
        }
        assert!(CommissioningStatus::from_code(14).is_none());
    }

    #[test]
    fn test_in_progress_is_not_terminal() {
        assert!(TerminalStatus::from_code(1).is_none());
        assert_eq!(CommissioningStatus::InProgress.terminal(), None);
        assert_eq!(
            CommissioningStatus::Finished(TerminalStatus::NoNetwork).terminal(),
            Some(TerminalStatus::NoNetwork)
        );
    }

    #[test]
    fn test_default_status_is_success() {
        assert_eq!(
            CommissioningStatus::default(),
            CommissioningStatus::Finished(TerminalStatus::Success)
        );
    }
}
