//! Finding & binding state machine.

use crate::FindBindConfig;
use bdb_core::{Action, BindDestination, Event, Notification, StackRequest, TimerId};
use bdb_types::{
    ClusterId, DiscoveryQueue, DiscoveryQueueFull, Endpoint, ExtendedAddress, FindBindDestination,
    GroupId, NetworkAddress, SimpleDescriptor, StackStatus, TerminalStatus,
};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Idle,

    // Initiator
    /// Collecting identify query responses.
    Querying,
    Describing {
        destination: FindBindDestination,
        requested: bool,
    },
    Resolving {
        destination: FindBindDestination,
        clusters: Vec<ClusterId>,
    },
    Binding {
        destination: FindBindDestination,
        bind_to: BindDestination,
        pending: VecDeque<ClusterId>,
        all_bound: bool,
    },

    // Target
    Identifying {
        endpoint: Endpoint,
        remaining: u16,
    },
}

/// Finding & binding sub-state machine.
pub struct FindingBinding {
    config: FindBindConfig,

    phase: Phase,

    /// Identify query responders not yet examined.
    queue: DiscoveryQueue,

    /// Clusters to bind. Empty means the local client clusters.
    match_clusters: Vec<ClusterId>,

    /// Local endpoint of the current run.
    local_endpoint: Endpoint,

    /// Clusters to bind in the current run.
    clusters: Vec<ClusterId>,

    /// Group to bind to in the current run.
    group: GroupId,

    now: Duration,
}

impl FindingBinding {
    pub fn new(config: FindBindConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            queue: DiscoveryQueue::new(),
            match_clusters: Vec::new(),
            local_endpoint: Endpoint(1),
            clusters: Vec::new(),
            group: GroupId::UNASSIGNED,
            now: Duration::ZERO,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Public API
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    /// Restrict binding to these clusters.
    pub fn set_match_clusters(&mut self, clusters: Vec<ClusterId>) {
        self.match_clusters = clusters;
    }

    /// Check if either role is running.
    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Check if the initiator role is running.
    pub fn is_initiator_active(&self) -> bool {
        !matches!(self.phase, Phase::Idle | Phase::Identifying { .. })
    }

    /// Responders waiting to be examined.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Drop whatever is in progress.
    pub fn abort(&mut self) -> Vec<Action> {
        if self.phase == Phase::Idle {
            return vec![];
        }
        debug!(phase = ?self.phase, "Aborting finding & binding");
        self.phase = Phase::Idle;
        self.queue.clear();
        vec![Action::CancelTimer {
            id: TimerId::FindBind,
        }]
    }

    /// Begin as initiator on the local endpoint described by `local`.
    pub fn start_initiator(&mut self, local: &SimpleDescriptor, group: GroupId) -> Vec<Action> {
        self.queue.clear();
        self.local_endpoint = local.endpoint;
        self.group = group;
        self.clusters = if self.match_clusters.is_empty() {
            local.out_clusters.clone()
        } else {
            self.match_clusters.clone()
        };
        info!(
            endpoint = %local.endpoint,
            clusters = self.clusters.len(),
            %group,
            "Starting finding & binding as initiator"
        );

        self.phase = Phase::Querying;
        vec![
            Action::Stack(StackRequest::IdentifyQuery {
                source_endpoint: local.endpoint,
            }),
            Action::SetTimer {
                id: TimerId::FindBind,
                duration: self.config.identify_query_window,
            },
        ]
    }

    /// Begin as target: identify on `endpoint`.
    pub fn start_target(&mut self, endpoint: Endpoint, own_address: NetworkAddress) -> Vec<Action> {
        let remaining = self.config.identify_time;
        info!(%endpoint, identify_time = remaining, "Starting finding & binding as target");
        self.local_endpoint = endpoint;
        self.phase = Phase::Identifying {
            endpoint,
            remaining,
        };
        vec![
            Action::Stack(StackRequest::Identify {
                endpoint,
                duration: remaining,
            }),
            Action::Notify(Notification::Identify {
                endpoint,
                source: own_address,
                identify_time: remaining,
            }),
            Action::SetTimer {
                id: TimerId::FindBind,
                duration: self.config.identify_tick,
            },
        ]
    }

    /// Queue an endpoint to examine, as if it had answered the identify query.
    pub fn add_responder(
        &mut self,
        destination: FindBindDestination,
    ) -> Result<(), DiscoveryQueueFull> {
        self.queue.push(destination)?;
        debug!(%destination, queued = self.queue.len(), "Identify responder queued");
        Ok(())
    }

    /// Identify Query Response heard by the initiator.
    pub fn on_identify_query_response(
        &mut self,
        source: NetworkAddress,
        endpoint: Endpoint,
        timeout: u16,
    ) -> Vec<Action> {
        if !self.is_initiator_active() {
            debug!(%source, "Ignoring identify query response");
            return vec![];
        }
        if timeout == 0 {
            debug!(%source, %endpoint, "Responder stopped identifying");
            return vec![];
        }
        if let Err(e) = self.add_responder(FindBindDestination {
            address: source,
            endpoint,
        }) {
            warn!(error = %e, "Discovery queue full");
        }
        vec![]
    }

    /// Finding & binding timer expired.
    pub fn on_timer(&mut self, own_address: NetworkAddress) -> Vec<Action> {
        match self.phase {
            Phase::Idle | Phase::Binding { .. } => {
                debug!(phase = ?self.phase, "Ignoring stale finding & binding timer");
                vec![]
            }
            Phase::Querying => {
                if self.queue.is_empty() {
                    info!("No identify query responses");
                    return self.finish(TerminalStatus::NoIdentifyQueryResponse);
                }
                debug!(queued = self.queue.len(), "Identify query window closed");
                self.next_target()
            }
            Phase::Describing { destination, .. } | Phase::Resolving { destination, .. } => {
                warn!(%destination, "No response from responder, skipping");
                self.next_target()
            }
            Phase::Identifying {
                endpoint,
                remaining,
            } => {
                let remaining = remaining.saturating_sub(1);
                self.phase = Phase::Identifying {
                    endpoint,
                    remaining,
                };
                let mut actions = vec![Action::Notify(Notification::Identify {
                    endpoint,
                    source: own_address,
                    identify_time: remaining,
                })];
                if remaining == 0 {
                    actions.extend(self.finish(TerminalStatus::Success));
                } else {
                    actions.push(Action::SetTimer {
                        id: TimerId::FindBind,
                        duration: self.config.identify_tick,
                    });
                }
                actions
            }
        }
    }

    /// Send the simple-descriptor request for the current responder.
    pub fn on_simple_desc_req(&mut self) -> Vec<Action> {
        let Phase::Describing {
            destination,
            requested,
        } = &mut self.phase
        else {
            debug!("Ignoring simple descriptor step");
            return vec![];
        };
        if *requested {
            return vec![];
        }
        *requested = true;
        vec![Action::Stack(StackRequest::SimpleDescriptorRequest {
            destination: destination.address,
            endpoint: destination.endpoint,
        })]
    }

    /// Simple_Desc_rsp from the current responder.
    pub fn on_simple_descriptor_response(
        &mut self,
        status: StackStatus,
        source: NetworkAddress,
        descriptor: Option<SimpleDescriptor>,
    ) -> Vec<Action> {
        let destination = match self.phase {
            Phase::Describing { destination, .. } if destination.address == source => destination,
            _ => {
                debug!(%source, "Ignoring simple descriptor response");
                return vec![];
            }
        };

        let descriptor = match descriptor {
            Some(d) if status.is_success() && d.endpoint == destination.endpoint => d,
            _ => {
                warn!(%destination, %status, "Simple descriptor request failed");
                return self.next_target();
            }
        };

        let matched: Vec<ClusterId> = self
            .clusters
            .iter()
            .copied()
            .filter(|c| descriptor.in_clusters.contains(c))
            .collect();
        if matched.is_empty() {
            debug!(%destination, "No matching clusters");
            return self.next_target();
        }
        debug!(%destination, matched = matched.len(), "Clusters matched");

        if self.group.is_assigned() {
            let mut actions = vec![Action::Stack(StackRequest::AddGroup {
                destination: destination.address,
                endpoint: destination.endpoint,
                group: self.group,
            })];
            actions.extend(self.start_binding(
                destination,
                BindDestination::Group(self.group),
                matched,
            ));
            return actions;
        }

        self.phase = Phase::Resolving {
            destination,
            clusters: matched,
        };
        vec![
            Action::Stack(StackRequest::IeeeAddressRequest {
                destination: destination.address,
            }),
            Action::SetTimer {
                id: TimerId::FindBind,
                duration: self.config.response_timeout,
            },
        ]
    }

    /// IEEE_addr_rsp from the current responder.
    pub fn on_ieee_address_response(
        &mut self,
        status: StackStatus,
        source: NetworkAddress,
        ieee: ExtendedAddress,
    ) -> Vec<Action> {
        let (destination, clusters) = match &mut self.phase {
            Phase::Resolving {
                destination,
                clusters,
            } if destination.address == source => (*destination, std::mem::take(clusters)),
            _ => {
                debug!(%source, "Ignoring IEEE address response");
                return vec![];
            }
        };

        if !status.is_success() {
            warn!(%destination, %status, "IEEE address request failed");
            return self.next_target();
        }
        self.start_binding(
            destination,
            BindDestination::Unicast {
                address: ieee,
                endpoint: destination.endpoint,
            },
            clusters,
        )
    }

    /// Outcome of a local `Bind`.
    pub fn on_bind_confirm(&mut self, status: StackStatus) -> Vec<Action> {
        let Phase::Binding {
            destination,
            bind_to,
            pending,
            all_bound,
        } = &mut self.phase
        else {
            debug!(%status, "Ignoring bind confirm");
            return vec![];
        };

        match status {
            StackStatus::Success => {}
            StackStatus::TableFull => {
                warn!(%destination, "Binding table full");
                return self.finish(TerminalStatus::BindingTableFull);
            }
            other => {
                warn!(%destination, status = %other, "Bind failed");
                *all_bound = false;
            }
        }

        if let Some(cluster) = pending.pop_front() {
            return vec![Action::Stack(StackRequest::Bind {
                source_endpoint: self.local_endpoint,
                cluster,
                destination: *bind_to,
            })];
        }

        let (destination, all_bound) = (*destination, *all_bound);
        let mut actions = Vec::new();
        if all_bound {
            info!(%destination, "Bound all matching clusters");
            actions.push(Action::Notify(Notification::FindBindSuccess { destination }));
        }
        actions.extend(self.next_target());
        actions
    }

    /// The local identify time was written by someone else.
    pub fn on_identify_time_changed(&mut self, endpoint: Endpoint, remaining: u16) -> Vec<Action> {
        let Phase::Identifying {
            endpoint: identifying,
            remaining: current,
        } = &mut self.phase
        else {
            return vec![];
        };
        if *identifying != endpoint {
            return vec![];
        }
        if remaining == 0 {
            info!(%endpoint, "Identify stopped early");
            return self.finish(TerminalStatus::Success);
        }
        *current = remaining;
        vec![]
    }

    /// Identify Query heard by the target.
    pub fn on_identify_query_received(&mut self, source: NetworkAddress) -> Vec<Action> {
        let Phase::Identifying {
            endpoint,
            remaining,
        } = self.phase
        else {
            return vec![];
        };
        vec![Action::Stack(StackRequest::IdentifyQueryResponse {
            destination: source,
            endpoint,
            timeout: remaining,
        })]
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Internals
    // ═══════════════════════════════════════════════════════════════════════════

    fn next_target(&mut self) -> Vec<Action> {
        match self.queue.pop() {
            Some(destination) => {
                debug!(%destination, remaining = self.queue.len(), "Examining responder");
                self.phase = Phase::Describing {
                    destination,
                    requested: false,
                };
                vec![
                    Action::EnqueueInternal {
                        event: Event::FindOrBindSimpleDescReq,
                    },
                    Action::SetTimer {
                        id: TimerId::FindBind,
                        duration: self.config.response_timeout,
                    },
                ]
            }
            None => self.finish(TerminalStatus::Success),
        }
    }

    fn start_binding(
        &mut self,
        destination: FindBindDestination,
        bind_to: BindDestination,
        clusters: Vec<ClusterId>,
    ) -> Vec<Action> {
        let mut pending: VecDeque<ClusterId> = clusters.into();
        let Some(first) = pending.pop_front() else {
            return self.next_target();
        };
        self.phase = Phase::Binding {
            destination,
            bind_to,
            pending,
            all_bound: true,
        };
        vec![
            Action::CancelTimer {
                id: TimerId::FindBind,
            },
            Action::Stack(StackRequest::Bind {
                source_endpoint: self.local_endpoint,
                cluster: first,
                destination: bind_to,
            }),
        ]
    }

    fn finish(&mut self, status: TerminalStatus) -> Vec<Action> {
        info!(%status, "Finding & binding finished");
        self.phase = Phase::Idle;
        self.queue.clear();
        vec![
            Action::CancelTimer {
                id: TimerId::FindBind,
            },
            Action::EnqueueInternal {
                event: Event::FindOrBindFinished { status },
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    const LIGHT: NetworkAddress = NetworkAddress(0x1001);
    const LIGHT_IEEE: ExtendedAddress = ExtendedAddress(0x00AB_CDEF_0000_1001);

    fn switch() -> SimpleDescriptor {
        SimpleDescriptor::new(Endpoint(1), 0x0103)
            .with_out_clusters([ClusterId::ON_OFF, ClusterId::LEVEL_CONTROL, ClusterId::SCENES])
    }

    fn light() -> SimpleDescriptor {
        SimpleDescriptor::new(Endpoint(11), 0x0100).with_in_clusters([
            ClusterId::IDENTIFY,
            ClusterId::ON_OFF,
            ClusterId::LEVEL_CONTROL,
        ])
    }

    fn finished(actions: &[Action]) -> Option<TerminalStatus> {
        actions.iter().find_map(|a| match a {
            Action::EnqueueInternal {
                event: Event::FindOrBindFinished { status },
            } => Some(*status),
            _ => None,
        })
    }

    fn binds(actions: &[Action]) -> Vec<(ClusterId, BindDestination)> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Stack(StackRequest::Bind {
                    cluster,
                    destination,
                    ..
                }) => Some((*cluster, *destination)),
                _ => None,
            })
            .collect()
    }

    /// Run the initiator up to the first bind request.
    fn reach_binding(fb: &mut FindingBinding, group: GroupId) -> Vec<Action> {
        fb.start_initiator(&switch(), group);
        fb.on_identify_query_response(LIGHT, Endpoint(11), 180);
        fb.on_timer(NetworkAddress(0));
        let actions = fb.on_simple_desc_req();
        assert_eq!(
            actions,
            vec![Action::Stack(StackRequest::SimpleDescriptorRequest {
                destination: LIGHT,
                endpoint: Endpoint(11),
            })]
        );
        fb.on_simple_descriptor_response(StackStatus::Success, LIGHT, Some(light()))
    }

    #[traced_test]
    #[test]
    fn test_no_responders_reports_no_identify_query_response() {
        let mut fb = FindingBinding::new(FindBindConfig::default());
        let actions = fb.start_initiator(&switch(), GroupId::UNASSIGNED);
        assert_eq!(
            actions[1],
            Action::SetTimer {
                id: TimerId::FindBind,
                duration: Duration::from_secs(5),
            }
        );

        let actions = fb.on_timer(NetworkAddress(0));
        assert_eq!(
            finished(&actions),
            Some(TerminalStatus::NoIdentifyQueryResponse)
        );
    }

    #[traced_test]
    #[test]
    fn test_unicast_binding_per_matched_cluster() {
        let mut fb = FindingBinding::new(FindBindConfig::default());
        let actions = reach_binding(&mut fb, GroupId::UNASSIGNED);
        assert_eq!(
            actions[0],
            Action::Stack(StackRequest::IeeeAddressRequest { destination: LIGHT })
        );

        let unicast = BindDestination::Unicast {
            address: LIGHT_IEEE,
            endpoint: Endpoint(11),
        };
        let actions = fb.on_ieee_address_response(StackStatus::Success, LIGHT, LIGHT_IEEE);
        assert_eq!(binds(&actions), vec![(ClusterId::ON_OFF, unicast)]);

        let actions = fb.on_bind_confirm(StackStatus::Success);
        assert_eq!(binds(&actions), vec![(ClusterId::LEVEL_CONTROL, unicast)]);

        let actions = fb.on_bind_confirm(StackStatus::Success);
        assert!(actions.contains(&Action::Notify(Notification::FindBindSuccess {
            destination: FindBindDestination {
                address: LIGHT,
                endpoint: Endpoint(11),
            }
        })));
        assert_eq!(finished(&actions), Some(TerminalStatus::Success));
    }

    #[traced_test]
    #[test]
    fn test_group_binding_adds_target_to_group() {
        let mut fb = FindingBinding::new(FindBindConfig::default());
        let actions = reach_binding(&mut fb, GroupId(0x0042));

        assert_eq!(
            actions[0],
            Action::Stack(StackRequest::AddGroup {
                destination: LIGHT,
                endpoint: Endpoint(11),
                group: GroupId(0x0042),
            })
        );
        assert_eq!(
            binds(&actions),
            vec![(ClusterId::ON_OFF, BindDestination::Group(GroupId(0x0042)))]
        );
    }

    #[traced_test]
    #[test]
    fn test_binding_table_full_aborts() {
        let mut fb = FindingBinding::new(FindBindConfig::default());
        reach_binding(&mut fb, GroupId(0x0042));

        let actions = fb.on_bind_confirm(StackStatus::TableFull);
        assert_eq!(finished(&actions), Some(TerminalStatus::BindingTableFull));
        assert!(!fb.is_active());
    }

    #[traced_test]
    #[test]
    fn test_silent_responder_is_skipped() {
        let mut fb = FindingBinding::new(FindBindConfig::default());
        fb.start_initiator(&switch(), GroupId::UNASSIGNED);
        fb.on_identify_query_response(LIGHT, Endpoint(11), 180);
        fb.on_identify_query_response(NetworkAddress(0x2002), Endpoint(3), 180);
        fb.on_timer(NetworkAddress(0));
        fb.on_simple_desc_req();

        let actions = fb.on_timer(NetworkAddress(0));
        assert!(actions.contains(&Action::EnqueueInternal {
            event: Event::FindOrBindSimpleDescReq
        }));
        assert_eq!(
            fb.on_simple_desc_req(),
            vec![Action::Stack(StackRequest::SimpleDescriptorRequest {
                destination: NetworkAddress(0x2002),
                endpoint: Endpoint(3),
            })]
        );
    }

    #[traced_test]
    #[test]
    fn test_discovery_queue_rejects_sixth_responder() {
        let mut fb = FindingBinding::new(FindBindConfig::default());
        fb.start_initiator(&switch(), GroupId::UNASSIGNED);
        for i in 0..6u16 {
            fb.on_identify_query_response(NetworkAddress(0x3000 + i), Endpoint(1), 60);
        }
        assert_eq!(fb.queued(), 5);
        assert!(fb
            .add_responder(FindBindDestination {
                address: NetworkAddress(0x4000),
                endpoint: Endpoint(1),
            })
            .is_err());
    }

    #[traced_test]
    #[test]
    fn test_target_identifies_and_counts_down() {
        let config = FindBindConfig::with_identify_time(3);
        let mut fb = FindingBinding::new(config);
        let own = NetworkAddress(0x5555);

        let actions = fb.start_target(Endpoint(11), own);
        assert!(actions.contains(&Action::Notify(Notification::Identify {
            endpoint: Endpoint(11),
            source: own,
            identify_time: 3,
        })));

        let actions = fb.on_identify_query_received(LIGHT);
        assert_eq!(
            actions,
            vec![Action::Stack(StackRequest::IdentifyQueryResponse {
                destination: LIGHT,
                endpoint: Endpoint(11),
                timeout: 3,
            })]
        );

        fb.on_timer(own);
        fb.on_timer(own);
        let actions = fb.on_timer(own);
        assert!(actions.contains(&Action::Notify(Notification::Identify {
            endpoint: Endpoint(11),
            source: own,
            identify_time: 0,
        })));
        assert_eq!(finished(&actions), Some(TerminalStatus::Success));
    }

    #[traced_test]
    #[test]
    fn test_target_ends_when_identify_cleared() {
        let mut fb = FindingBinding::new(FindBindConfig::default());
        fb.start_target(Endpoint(11), NetworkAddress(1));

        assert!(fb.on_identify_time_changed(Endpoint(11), 20).is_empty());
        let actions = fb.on_identify_time_changed(Endpoint(11), 0);
        assert_eq!(finished(&actions), Some(TerminalStatus::Success));
    }
}
