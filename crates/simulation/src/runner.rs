//! Simulation runner.

use crate::{EventKey, SimulationError};
use bdb_controller::{CommissioningController, ControllerError};
use bdb_core::{Action, Event, NetworkStack, Notification, StackRequest, StateMachine, TimerId};
use bdb_types::TerminalStatus;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, trace};

/// Statistics collected during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationStats {
    pub events_processed: u64,
    pub actions_generated: u64,
    pub timers_set: u64,
    pub timers_cancelled: u64,
    pub stack_requests: u64,
    pub notifications: u64,
}

/// Deterministic runner for one controller and its network stack.
///
/// Owns virtual time, the armed timers and the event queue. Every action the
/// controller returns is executed here: timers are scheduled, stack requests
/// are submitted to the stack and their replies queued, notifications are
/// recorded for inspection.
pub struct SimulationRunner<S: NetworkStack> {
    controller: CommissioningController,
    stack: S,

    queue: BTreeMap<EventKey, Event>,

    /// Queue key of each armed timer.
    timers: HashMap<TimerId, EventKey>,

    sequence: u64,
    now: Duration,

    notifications: Vec<(Duration, Notification)>,
    requests: Vec<(Duration, StackRequest)>,
    stats: SimulationStats,
}

impl<S: NetworkStack> SimulationRunner<S> {
    pub fn new(controller: CommissioningController, stack: S) -> Self {
        Self {
            controller,
            stack,
            queue: BTreeMap::new(),
            timers: HashMap::new(),
            sequence: 0,
            now: Duration::ZERO,
            notifications: Vec::new(),
            requests: Vec::new(),
            stats: SimulationStats::default(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn controller(&self) -> &CommissioningController {
        &self.controller
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Every notification delivered so far, with its delivery time.
    pub fn notifications(&self) -> &[(Duration, Notification)] {
        &self.notifications
    }

    /// Every stack request submitted so far, with its submission time.
    pub fn requests(&self) -> &[(Duration, StackRequest)] {
        &self.requests
    }

    /// Count submitted requests matching a predicate.
    pub fn count_requests(&self, predicate: impl Fn(&StackRequest) -> bool) -> usize {
        self.requests.iter().filter(|(_, r)| predicate(r)).count()
    }

    /// Statuses of all commissioning reports, in delivery order.
    pub fn commissioning_results(&self) -> Vec<TerminalStatus> {
        self.notifications
            .iter()
            .filter_map(|(_, n)| n.commissioning_status())
            .collect()
    }

    pub fn last_commissioning_status(&self) -> Option<TerminalStatus> {
        self.commissioning_results().last().copied()
    }

    /// Check if a timer is armed.
    pub fn is_timer_armed(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Driving
    // ═══════════════════════════════════════════════════════════════════════════

    /// Call a controller entry point at the current time and execute its actions.
    pub fn invoke<F>(&mut self, entry: F) -> Result<(), ControllerError>
    where
        F: FnOnce(&mut CommissioningController) -> Result<Vec<Action>, ControllerError>,
    {
        self.controller.set_time(self.now);
        let actions = entry(&mut self.controller)?;
        self.apply(actions);
        Ok(())
    }

    /// Queue an unsolicited stack indication `delay` from now.
    pub fn inject(&mut self, delay: Duration, event: Event) {
        self.schedule(self.now + delay, event);
    }

    /// Process the next queued event. Returns false when the queue is empty.
    pub fn step(&mut self) -> bool {
        let Some((key, event)) = self.queue.pop_first() else {
            return false;
        };
        self.now = key.time;

        if let Event::TimerFired { id } = event {
            if self.timers.get(&id) == Some(&key) {
                self.timers.remove(&id);
            }
        }

        trace!(time = ?self.now, event = event.type_name(), "Processing event");
        self.stats.events_processed += 1;
        self.controller.set_time(self.now);
        let actions = self.controller.handle(event);
        self.apply(actions);
        true
    }

    /// Process every event scheduled up to and including `end`.
    pub fn run_until(&mut self, end: Duration) {
        while self
            .queue
            .first_key_value()
            .map_or(false, |(key, _)| key.time <= end)
        {
            self.step();
        }
        self.now = self.now.max(end);
    }

    /// Run until the queue drains or `limit` is reached.
    ///
    /// Returns true if the queue drained.
    pub fn run_until_quiet(&mut self, limit: Duration) -> bool {
        while let Some((key, _)) = self.queue.first_key_value() {
            if key.time > limit {
                debug!(time = ?self.now, pending = self.queue.len(), "Time limit reached");
                return false;
            }
            self.step();
        }
        true
    }

    /// Run until the controller is idle with nothing internal pending, or
    /// until `limit`. Returns true if the controller became idle.
    pub fn run_until_idle(&mut self, limit: Duration) -> bool {
        loop {
            if self.controller.is_idle() && !self.has_internal_pending() {
                return true;
            }
            match self.queue.first_key_value() {
                Some((key, _)) if key.time <= limit => {
                    self.step();
                }
                _ => return self.controller.is_idle(),
            }
        }
    }

    /// [`run_until_idle`](Self::run_until_idle), reporting why the controller
    /// did not get there.
    pub fn settle(&mut self, limit: Duration) -> Result<(), SimulationError> {
        if self.run_until_idle(limit) {
            return Ok(());
        }
        let state = self.controller.state();
        if self.queue.is_empty() {
            Err(SimulationError::Stalled {
                state,
                time: self.now,
            })
        } else {
            Err(SimulationError::TimeLimit {
                state,
                limit,
                pending: self.queue.len(),
            })
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Internals
    // ═══════════════════════════════════════════════════════════════════════════

    fn has_internal_pending(&self) -> bool {
        self.queue.values().any(Event::is_internal)
    }

    fn schedule(&mut self, time: Duration, event: Event) -> EventKey {
        let key = EventKey::new(time, &event, self.sequence);
        self.sequence += 1;
        self.queue.insert(key, event);
        key
    }

    fn cancel_timer(&mut self, id: TimerId) -> bool {
        match self.timers.remove(&id) {
            Some(key) => {
                self.queue.remove(&key);
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, actions: Vec<Action>) {
        for action in actions {
            self.stats.actions_generated += 1;
            match action {
                Action::SetTimer { id, duration } => {
                    self.cancel_timer(id);
                    let key = self.schedule(self.now + duration, Event::TimerFired { id });
                    self.timers.insert(id, key);
                    self.stats.timers_set += 1;
                }
                Action::CancelTimer { id } => {
                    if self.cancel_timer(id) {
                        self.stats.timers_cancelled += 1;
                    }
                }
                Action::EnqueueInternal { event } => {
                    self.schedule(self.now, event);
                }
                Action::Stack(request) => {
                    trace!(time = ?self.now, request = request.type_name(), "Stack request");
                    self.stats.stack_requests += 1;
                    let replies = self.stack.submit(self.now, &request);
                    self.requests.push((self.now, request));
                    for reply in replies {
                        self.schedule(self.now + reply.delay, reply.event);
                    }
                }
                Action::Notify(notification) => {
                    debug!(time = ?self.now, notification = ?notification, "Notification");
                    self.stats.notifications += 1;
                    self.notifications.push((self.now, notification));
                }
            }
        }
    }
}
