//! Timer identifiers.

use std::fmt;

/// One timer per sub-procedure.
///
/// Arming a timer that is already armed replaces it, so a sub-procedure can
/// never hold two timers at once. Phases of the same sub-procedure share its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerId {
    /// Network steering (post-join settle delay).
    Steering,
    /// Trust-center link-key exchange (start delay, attempt window, leave wait).
    TcLinkKey,
    /// Touchlink (scan dwell, transaction lifetime, startup delay, target RX window).
    Touchlink,
    /// Finding & binding (identify-query window, simple-descriptor window, identify tick).
    FindBind,
    /// Leave wait during a factory reset.
    Reset,
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
