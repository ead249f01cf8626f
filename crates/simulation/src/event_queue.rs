//! Event ordering for the simulation queue.

use bdb_core::Event;
use std::time::Duration;

/// Processing order of events scheduled for the same instant.
///
/// Internal events finish the step that produced them before anything else
/// is looked at, then stack replies, then timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventPriority {
    Internal = 0,
    Stack = 1,
    Timer = 2,
}

impl EventPriority {
    pub fn of(event: &Event) -> Self {
        if event.is_internal() {
            EventPriority::Internal
        } else if matches!(event, Event::TimerFired { .. }) {
            EventPriority::Timer
        } else {
            EventPriority::Stack
        }
    }
}

/// Key for ordering events in the simulation queue.
///
/// Field order is significant: the derived `Ord` sorts by time, then
/// priority, then insertion sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub time: Duration,
    pub priority: EventPriority,
    pub sequence: u64,
}

impl EventKey {
    pub fn new(time: Duration, event: &Event, sequence: u64) -> Self {
        Self {
            time,
            priority: EventPriority::of(event),
            sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdb_core::TimerId;
    use bdb_types::StackStatus;

    #[test]
    fn test_same_instant_orders_by_priority() {
        let now = Duration::from_millis(100);
        let timer = EventKey::new(now, &Event::TimerFired { id: TimerId::Steering }, 0);
        let reply = EventKey::new(
            now,
            &Event::LeaveConfirm {
                status: StackStatus::Success,
            },
            1,
        );
        let internal = EventKey::new(now, &Event::CommissioningStart, 2);

        let mut keys = vec![timer, reply, internal];
        keys.sort();
        assert_eq!(keys, vec![internal, reply, timer]);
    }

    #[test]
    fn test_earlier_time_wins_over_priority() {
        let timer = EventKey::new(Duration::from_millis(1), &Event::TimerFired { id: TimerId::Reset }, 5);
        let internal = EventKey::new(Duration::from_millis(2), &Event::CommissioningStart, 0);
        assert!(timer < internal);
    }
}
