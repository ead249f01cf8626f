//! Actions returned by the commissioning state machines.

use crate::{Event, Notification, StackRequest, TimerId};
use std::time::Duration;

/// Side effects requested by a state machine; the runner performs them.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Arm (or re-arm) a timer.
    SetTimer { id: TimerId, duration: Duration },

    /// Disarm a timer. No-op if it is not armed.
    CancelTimer { id: TimerId },

    /// Feed an event back to the controller after the current one.
    EnqueueInternal { event: Event },

    /// Hand a request to the network stack.
    Stack(StackRequest),

    /// Deliver a callback to the application.
    Notify(Notification),
}

impl Action {
    /// Get a human-readable name for this action type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::SetTimer { .. } => "SetTimer",
            Action::CancelTimer { .. } => "CancelTimer",
            Action::EnqueueInternal { .. } => "EnqueueInternal",
            Action::Stack(_) => "Stack",
            Action::Notify(_) => "Notify",
        }
    }

    /// The stack request, if this action carries one.
    pub fn as_stack(&self) -> Option<&StackRequest> {
        match self {
            Action::Stack(request) => Some(request),
            _ => None,
        }
    }

    /// The notification, if this action carries one.
    pub fn as_notification(&self) -> Option<&Notification> {
        match self {
            Action::Notify(notification) => Some(notification),
            _ => None,
        }
    }
}
