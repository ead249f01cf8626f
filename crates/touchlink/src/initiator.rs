//! Touchlink initiator.

use crate::state::{Phase, Transaction};
use crate::Touchlink;
use bdb_core::{Action, Event, StackRequest, TimerId};
use bdb_types::{
    Channel, ChannelMask, DeviceType, ExtendedAddress, ExtendedPanId, LinkKey, NetworkAddress,
    NetworkInfo, NetworkType, PanId, ScanResponse, TerminalStatus, TouchlinkNetworkKind,
    TouchlinkNetworkParams, KEY_LEN,
};
use rand::Rng;
use std::iter;
use tracing::{debug, info, warn};

/// Address given to the target of a network start.
const START_TARGET_ADDRESS: NetworkAddress = NetworkAddress(0x0001);

/// Address the initiator takes on a network it started through a target.
const START_INITIATOR_ADDRESS: NetworkAddress = NetworkAddress(0x0002);

impl Touchlink {
    /// Begin an initiator transaction.
    pub fn start_initiator(
        &mut self,
        factory_new: bool,
        network: Option<NetworkInfo>,
    ) -> Vec<Action> {
        self.factory_new = factory_new;
        self.network = network;
        self.responses.clear();
        self.transaction = Some(Transaction {
            id: self.fresh_id(),
            started_at: self.now,
        });

        let plan = self.primary_plan();
        info!(
            factory_new,
            scans = plan.len(),
            transaction_id = self.transaction.map(|t| t.id),
            "Starting touchlink scan"
        );
        self.phase = Phase::Scanning {
            plan,
            index: 0,
            extended: false,
        };
        self.send_scan_request()
    }

    /// Scan response heard on the current channel.
    pub fn on_scan_response(&mut self, response: ScanResponse) -> Vec<Action> {
        if !matches!(self.phase, Phase::Scanning { .. }) {
            debug!(source = %response.source, "Ignoring scan response outside of scan");
            return vec![];
        }
        let Some(transaction) = self.transaction else {
            return vec![];
        };

        if response.transaction_id != transaction.id {
            debug!(
                expected = transaction.id,
                got = response.transaction_id,
                "Scan response for another transaction"
            );
            return vec![];
        }
        if self.transaction_expired() {
            warn!(
                source = %response.source,
                age = ?self.transaction_age(),
                "Scan response after transaction lifetime"
            );
            return vec![];
        }
        if response.lqi < self.lqi_threshold {
            debug!(
                source = %response.source,
                lqi = response.lqi,
                threshold = self.lqi_threshold,
                "Scan response below LQI threshold"
            );
            return vec![];
        }
        if response.key_bitmask & self.key_bitmask == 0 {
            debug!(
                source = %response.source,
                key_bitmask = response.key_bitmask,
                "Scan response with no common touchlink key"
            );
            return vec![];
        }

        if self.responses.contains_key(&response.source)
            || self.responses.len() < self.config.max_scan_targets
        {
            debug!(
                source = %response.source,
                lqi = response.lqi,
                priority = response.priority_request,
                "Scan target recorded"
            );
            self.responses.insert(response.source, response);
        } else {
            debug!(source = %response.source, "Scan target list full");
        }
        vec![]
    }

    /// Target's answer to the network start/join request.
    pub fn on_network_response(
        &mut self,
        source: ExtendedAddress,
        transaction_id: u32,
        success: bool,
    ) -> Vec<Action> {
        let Phase::AwaitingNetworkResponse { target, own } = self.phase else {
            debug!(%source, "Ignoring network response outside of touchlink");
            return vec![];
        };
        if source != target || self.transaction.map(|t| t.id) != Some(transaction_id) {
            debug!(%source, transaction_id, "Network response from unexpected peer");
            return vec![];
        }
        if self.transaction_expired() {
            warn!(%source, "Network response after transaction lifetime");
            return self.finish(TerminalStatus::TargetFailure);
        }
        if !success {
            warn!(%source, "Target rejected network request");
            return self.finish(TerminalStatus::TargetFailure);
        }

        debug!(%source, delay = ?self.config.startup_delay, "Target accepted, waiting for startup");
        self.phase = Phase::StartupDelay { own };
        vec![Action::SetTimer {
            id: TimerId::Touchlink,
            duration: self.config.startup_delay,
        }]
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Scanning
    // ═══════════════════════════════════════════════════════════════════════════

    /// Repeated first primary channel, then the remaining primary channels.
    fn primary_plan(&self) -> Vec<Channel> {
        let mut channels = ChannelMask::TOUCHLINK_PRIMARY.channels();
        let mut plan = Vec::new();
        if let Some(first) = channels.next() {
            let repeats = self.config.first_channel_scans.max(1) as usize;
            plan.extend(iter::repeat(first).take(repeats));
        }
        plan.extend(channels);
        plan
    }

    pub(crate) fn on_scan_timer(&mut self) -> Vec<Action> {
        let Phase::Scanning {
            plan,
            index,
            extended,
        } = &mut self.phase
        else {
            return vec![];
        };

        *index += 1;
        if *index < plan.len() {
            return self.send_scan_request();
        }

        if !*extended && self.responses.is_empty() && self.config.extended_scan {
            debug!("Nothing heard on primary channels, extending scan");
            *plan = ChannelMask::TOUCHLINK_SECONDARY.channels().collect();
            *index = 0;
            *extended = true;
            if !plan.is_empty() {
                return self.send_scan_request();
            }
        }

        self.select_target()
    }

    fn send_scan_request(&mut self) -> Vec<Action> {
        let (Phase::Scanning { plan, index, .. }, Some(transaction)) =
            (&self.phase, self.transaction)
        else {
            return vec![];
        };
        let Some(channel) = plan.get(*index).copied() else {
            return vec![];
        };

        vec![
            Action::Stack(StackRequest::TouchlinkScanRequest {
                channel,
                transaction_id: transaction.id,
                factory_new: self.factory_new,
                address_assignment: self.can_assign_addresses(),
            }),
            Action::SetTimer {
                id: TimerId::Touchlink,
                duration: self.config.scan_time_base,
            },
        ]
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Target Selection
    // ═══════════════════════════════════════════════════════════════════════════

    fn select_target(&mut self) -> Vec<Action> {
        let chosen = if self.transaction_expired() {
            None
        } else {
            self.responses
                .values()
                .find(|r| r.priority_request)
                .or_else(|| self.responses.values().next())
                .copied()
        };

        let Some(target) = chosen else {
            return self.no_scan_response();
        };
        info!(
            target = %target.source,
            lqi = target.lqi,
            candidates = self.responses.len(),
            "Selected touchlink target"
        );

        if let Some(network) = self.network {
            if network.extended_pan_id == target.extended_pan_id {
                info!(target = %target.source, "Target already on this network");
                return self.finish(TerminalStatus::Success);
            }
            if network.network_type == NetworkType::Centralized && !self.config.allow_steal {
                warn!("Touchlink refused on a centralized network");
                return self.finish(TerminalStatus::NotPermitted);
            }
        }
        if !self.can_assign_addresses() && !target.address_assignment {
            warn!(target = %target.source, "Neither side can assign addresses");
            return self.finish(TerminalStatus::NotAddressAssignmentCapable);
        }

        let Some(transaction) = self.transaction else {
            return self.finish(TerminalStatus::TargetFailure);
        };
        let (kind, params, own) = self.network_request(&target);
        debug!(?kind, target = %target.source, address = %params.network_address, "Sending network request");

        let remaining = self
            .config
            .transaction_lifetime
            .saturating_sub(self.transaction_age().unwrap_or_default());
        self.phase = Phase::AwaitingNetworkResponse {
            target: target.source,
            own,
        };
        vec![
            Action::Stack(StackRequest::TouchlinkIdentify {
                target: target.source,
                transaction_id: transaction.id,
                duration: self.config.identify_duration,
            }),
            Action::Stack(StackRequest::TouchlinkNetworkRequest {
                target: target.source,
                transaction_id: transaction.id,
                kind,
                params,
            }),
            Action::SetTimer {
                id: TimerId::Touchlink,
                duration: remaining,
            },
        ]
    }

    /// Join the target into this node's network, or have it start a new one.
    fn network_request(
        &mut self,
        target: &ScanResponse,
    ) -> (
        TouchlinkNetworkKind,
        TouchlinkNetworkParams,
        Option<TouchlinkNetworkParams>,
    ) {
        if let (Some(network), false) = (self.network, self.factory_new) {
            let params = TouchlinkNetworkParams {
                extended_pan_id: network.extended_pan_id,
                pan_id: network.pan_id,
                channel: network.channel,
                network_key: None,
                network_address: NetworkAddress(self.rng.gen_range(0x0003..=0xFFF7)),
            };
            return (TouchlinkNetworkKind::JoinRouter, params, None);
        }

        let mut key = [0u8; KEY_LEN];
        self.rng.fill(&mut key[..]);
        let params = TouchlinkNetworkParams {
            extended_pan_id: ExtendedPanId(self.rng.gen_range(1..u64::MAX)),
            pan_id: PanId(self.rng.gen_range(0x0001..=0xFFFE)),
            channel: target.channel,
            network_key: Some(LinkKey(key)),
            network_address: START_TARGET_ADDRESS,
        };
        let own = TouchlinkNetworkParams {
            network_address: START_INITIATOR_ADDRESS,
            ..params
        };
        (TouchlinkNetworkKind::Start, params, Some(own))
    }

    fn no_scan_response(&mut self) -> Vec<Action> {
        if self.factory_new {
            info!("No touchlink target found, falling back to steering");
            self.phase = Phase::Idle;
            self.transaction = None;
            self.responses.clear();
            return vec![Action::EnqueueInternal {
                event: Event::TouchlinkNoResponse,
            }];
        }
        info!("No touchlink target found");
        self.finish(TerminalStatus::NoScanResponse)
    }

    pub(crate) fn can_assign_addresses(&self) -> bool {
        self.device_type != DeviceType::EndDevice
    }
}

#[cfg(test)]
mod tests {
    use crate::{Touchlink, TouchlinkConfig};
    use bdb_core::{Action, Event, StackRequest, TimerId};
    use bdb_types::{
        Channel, CommissioningAttributes, CommissioningSettings, DeviceType, ExtendedAddress,
        ExtendedPanId, NetworkAddress, NetworkInfo, NetworkType, PanId, ScanResponse,
        StackStatus, TerminalStatus, TouchlinkNetworkKind, TL_KEY_BITMASK_CERTIFICATION,
    };
    use std::time::Duration;
    use tracing_test::traced_test;

    const LOCAL: ExtendedAddress = ExtendedAddress(0x1111);
    const LAMP: ExtendedAddress = ExtendedAddress(0x2222);

    fn make_initiator(config: TouchlinkConfig) -> Touchlink {
        let mut touchlink = Touchlink::new(config, DeviceType::Router, LOCAL, 3);
        touchlink.configure(
            &CommissioningSettings::default().with_touchlink(Channel(11), 0x80),
        );
        touchlink
    }

    fn transaction_id(actions: &[Action]) -> u32 {
        actions
            .iter()
            .find_map(|a| match a {
                Action::Stack(StackRequest::TouchlinkScanRequest { transaction_id, .. }) => {
                    Some(*transaction_id)
                }
                _ => None,
            })
            .unwrap()
    }

    fn response(transaction_id: u32, source: ExtendedAddress, lqi: u8) -> ScanResponse {
        ScanResponse {
            transaction_id,
            response_id: 9,
            source,
            lqi,
            factory_new: true,
            address_assignment: true,
            priority_request: false,
            key_bitmask: TL_KEY_BITMASK_CERTIFICATION,
            extended_pan_id: ExtendedPanId(0),
            pan_id: PanId(0),
            channel: Channel(11),
            network_address: NetworkAddress(0xFFFF),
        }
    }

    fn finished(actions: &[Action]) -> Option<TerminalStatus> {
        actions.iter().find_map(|a| match a {
            Action::EnqueueInternal {
                event: Event::TouchlinkFinished { status },
            } => Some(*status),
            _ => None,
        })
    }

    /// Fire scan timers until the initiator leaves the scan phase.
    fn finish_scan(touchlink: &mut Touchlink, step: Duration) -> Vec<Action> {
        loop {
            touchlink.set_time(touchlink.now + step);
            let actions = touchlink.on_timer();
            let scanning = actions
                .iter()
                .any(|a| matches!(a, Action::Stack(StackRequest::TouchlinkScanRequest { .. })));
            if !scanning {
                return actions;
            }
        }
    }

    #[traced_test]
    #[test]
    fn test_scan_plan_repeats_first_primary_channel() {
        let mut touchlink = make_initiator(TouchlinkConfig::without_extended_scan());
        let mut channels = Vec::new();

        let mut actions = touchlink.start_initiator(true, None);
        loop {
            let Some(channel) = actions.iter().find_map(|a| match a {
                Action::Stack(StackRequest::TouchlinkScanRequest { channel, .. }) => Some(*channel),
                _ => None,
            }) else {
                break;
            };
            channels.push(channel.0);
            actions = touchlink.on_timer();
        }

        assert_eq!(channels, vec![11, 11, 11, 11, 11, 15, 20, 25]);
        assert_eq!(
            actions,
            vec![Action::EnqueueInternal {
                event: Event::TouchlinkNoResponse
            }]
        );
    }

    #[traced_test]
    #[test]
    fn test_extended_scan_covers_secondary_channels() {
        let mut touchlink = make_initiator(TouchlinkConfig::default());
        touchlink.start_initiator(false, None);

        let mut scans = 1;
        let actions = loop {
            let actions = touchlink.on_timer();
            if actions
                .iter()
                .any(|a| matches!(a, Action::Stack(StackRequest::TouchlinkScanRequest { .. })))
            {
                scans += 1;
            } else {
                break actions;
            }
        };

        assert_eq!(scans, 8 + 12);
        assert_eq!(finished(&actions), Some(TerminalStatus::NoScanResponse));
    }

    #[traced_test]
    #[test]
    fn test_response_after_transaction_lifetime_is_rejected() {
        let mut touchlink = make_initiator(TouchlinkConfig::without_extended_scan());
        let id = transaction_id(&touchlink.start_initiator(true, None));

        touchlink.set_time(Duration::from_millis(8_001));
        touchlink.on_scan_response(response(id, LAMP, 0xF0));
        assert!(touchlink.responses.is_empty());

        let actions = finish_scan(&mut touchlink, Duration::from_millis(250));
        assert_eq!(
            actions,
            vec![Action::EnqueueInternal {
                event: Event::TouchlinkNoResponse
            }]
        );
    }

    #[traced_test]
    #[test]
    fn test_invalid_responses_are_filtered() {
        let mut touchlink = make_initiator(TouchlinkConfig::default());
        let id = transaction_id(&touchlink.start_initiator(true, None));

        touchlink.on_scan_response(response(id.wrapping_add(1), LAMP, 0xF0));
        touchlink.on_scan_response(response(id, LAMP, 0x10));
        touchlink.on_scan_response(ScanResponse {
            key_bitmask: 0,
            ..response(id, LAMP, 0xF0)
        });
        assert!(touchlink.responses.is_empty());

        for i in 0..6u64 {
            touchlink.on_scan_response(response(id, ExtendedAddress(0x5000 + i), 0xF0));
        }
        assert_eq!(touchlink.responses.len(), 4);
    }

    #[traced_test]
    #[test]
    fn test_factory_new_initiator_starts_network_through_target() {
        let mut touchlink = make_initiator(TouchlinkConfig::default());
        let mut attrs = CommissioningAttributes::default();
        let id = transaction_id(&touchlink.start_initiator(true, None));

        touchlink.on_scan_response(response(id, ExtendedAddress(0x3333), 0xC0));
        touchlink.on_scan_response(ScanResponse {
            priority_request: true,
            ..response(id, LAMP, 0xA0)
        });

        let actions = finish_scan(&mut touchlink, Duration::from_millis(250));
        let (kind, params) = actions
            .iter()
            .find_map(|a| match a {
                Action::Stack(StackRequest::TouchlinkNetworkRequest {
                    target,
                    kind,
                    params,
                    ..
                }) => {
                    assert_eq!(*target, LAMP);
                    Some((*kind, *params))
                }
                _ => None,
            })
            .unwrap();
        assert_eq!(kind, TouchlinkNetworkKind::Start);
        assert!(params.network_key.is_some());
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::Stack(StackRequest::TouchlinkIdentify { target, .. }) if *target == LAMP
        )));

        let actions = touchlink.on_network_response(LAMP, id, true);
        assert_eq!(
            actions,
            vec![Action::SetTimer {
                id: TimerId::Touchlink,
                duration: Duration::from_secs(2),
            }]
        );

        let actions = touchlink.on_timer();
        let applied = match &actions[..] {
            [Action::Stack(StackRequest::TouchlinkApplyNetwork { params })] => *params,
            other => panic!("unexpected actions {other:?}"),
        };
        assert_eq!(applied.extended_pan_id, params.extended_pan_id);
        assert_eq!(applied.network_address, NetworkAddress(0x0002));

        let network = NetworkInfo {
            pan_id: applied.pan_id,
            extended_pan_id: applied.extended_pan_id,
            channel: applied.channel,
            network_address: applied.network_address,
            network_type: NetworkType::Distributed,
        };
        let actions =
            touchlink.on_start_device_confirm(&mut attrs, StackStatus::Success, Some(network));
        assert_eq!(finished(&actions), Some(TerminalStatus::Success));
        assert!(attrs.node_is_on_a_network);
    }

    #[traced_test]
    #[test]
    fn test_rejected_network_request_is_target_failure() {
        let mut touchlink = make_initiator(TouchlinkConfig::default());
        let id = transaction_id(&touchlink.start_initiator(true, None));
        touchlink.on_scan_response(response(id, LAMP, 0xC0));
        finish_scan(&mut touchlink, Duration::from_millis(250));

        let actions = touchlink.on_network_response(LAMP, id, false);
        assert_eq!(finished(&actions), Some(TerminalStatus::TargetFailure));
    }

    #[traced_test]
    #[test]
    fn test_centralized_network_refuses_steal() {
        let mut touchlink = make_initiator(TouchlinkConfig::default());
        let network = NetworkInfo {
            pan_id: PanId(0x1234),
            extended_pan_id: ExtendedPanId(0xABCD),
            channel: Channel(15),
            network_address: NetworkAddress(0x4444),
            network_type: NetworkType::Centralized,
        };
        let id = transaction_id(&touchlink.start_initiator(false, Some(network)));
        touchlink.on_scan_response(response(id, LAMP, 0xC0));

        let actions = finish_scan(&mut touchlink, Duration::from_millis(250));
        assert_eq!(finished(&actions), Some(TerminalStatus::NotPermitted));
    }

    #[traced_test]
    #[test]
    fn test_end_device_needs_address_assignment_capable_target() {
        let mut touchlink =
            Touchlink::new(TouchlinkConfig::default(), DeviceType::EndDevice, LOCAL, 3);
        touchlink.configure(&CommissioningSettings::default().with_touchlink(Channel(11), 0));
        let id = transaction_id(&touchlink.start_initiator(true, None));
        touchlink.on_scan_response(ScanResponse {
            address_assignment: false,
            ..response(id, LAMP, 0xC0)
        });

        let actions = finish_scan(&mut touchlink, Duration::from_millis(250));
        assert_eq!(
            finished(&actions),
            Some(TerminalStatus::NotAddressAssignmentCapable)
        );
    }
}
