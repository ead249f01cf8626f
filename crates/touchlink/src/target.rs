//! Touchlink target.

use crate::state::{Phase, Transaction};
use crate::Touchlink;
use bdb_core::{Action, StackRequest, TimerId};
use bdb_types::{
    ExtendedAddress, NetworkInfo, NetworkType, ScanRequest, TerminalStatus, TouchlinkNetworkKind,
    TouchlinkNetworkParams,
};
use tracing::{debug, info, warn};

impl Touchlink {
    /// Scan request heard while listening.
    ///
    /// Starts (or restarts) the target role. The caller checks
    /// [`is_target_active`](Touchlink::is_target_active) afterwards to learn
    /// whether the request was answered.
    pub fn on_scan_request(
        &mut self,
        request: ScanRequest,
        factory_new: bool,
        network: Option<NetworkInfo>,
    ) -> Vec<Action> {
        if !self.enabled {
            debug!(source = %request.source, "Touchlink target disabled");
            return vec![];
        }
        if self.is_active() && !self.phase.is_target() {
            debug!(source = %request.source, "Initiator busy, ignoring scan request");
            return vec![];
        }
        if self.phase == Phase::TargetApplying {
            debug!(source = %request.source, "Already applying network, ignoring scan request");
            return vec![];
        }
        if request.lqi < self.lqi_threshold {
            debug!(
                source = %request.source,
                lqi = request.lqi,
                threshold = self.lqi_threshold,
                "Scan request below LQI threshold"
            );
            return vec![];
        }

        self.factory_new = factory_new;
        self.network = network;
        self.transaction = Some(Transaction {
            id: request.transaction_id,
            started_at: self.now,
        });
        self.phase = Phase::Listening {
            initiator: request.source,
        };
        let response_id = self.fresh_id();
        info!(
            initiator = %request.source,
            transaction_id = request.transaction_id,
            factory_new,
            "Answering touchlink scan request"
        );

        vec![
            Action::Stack(StackRequest::TouchlinkScanResponse {
                destination: request.source,
                transaction_id: request.transaction_id,
                response_id,
                factory_new,
                address_assignment: self.can_assign_addresses(),
                key_bitmask: self.key_bitmask,
            }),
            Action::SetTimer {
                id: TimerId::Touchlink,
                duration: self.config.rx_window,
            },
        ]
    }

    /// Network start/join command from the initiator.
    pub fn on_network_request(
        &mut self,
        source: ExtendedAddress,
        transaction_id: u32,
        kind: TouchlinkNetworkKind,
        params: TouchlinkNetworkParams,
    ) -> Vec<Action> {
        let Phase::Listening { initiator } = self.phase else {
            debug!(%source, "Ignoring network request outside of RX window");
            return vec![];
        };
        if source != initiator || self.transaction.map(|t| t.id) != Some(transaction_id) {
            debug!(%source, transaction_id, "Network request from unexpected peer");
            return vec![];
        }

        let centralized = self
            .network
            .map_or(false, |n| n.network_type == NetworkType::Centralized);
        if centralized && !self.config.allow_steal {
            warn!(%source, "Refusing touchlink off a centralized network");
            let mut actions = vec![Action::Stack(StackRequest::TouchlinkNetworkResponse {
                destination: source,
                transaction_id,
                success: false,
            })];
            actions.extend(self.finish(TerminalStatus::NotPermitted));
            return actions;
        }

        debug!(
            %source,
            ?kind,
            channel = %params.channel,
            address = %params.network_address,
            "Accepting touchlink network request"
        );
        // The start confirm ends the procedure from here on.
        self.phase = Phase::TargetApplying;
        vec![
            Action::CancelTimer {
                id: TimerId::Touchlink,
            },
            Action::Stack(StackRequest::TouchlinkNetworkResponse {
                destination: source,
                transaction_id,
                success: true,
            }),
            Action::Stack(StackRequest::TouchlinkApplyNetwork { params }),
        ]
    }

    pub(crate) fn on_rx_window_expired(&mut self) -> Vec<Action> {
        let status = if self.factory_new {
            TerminalStatus::TargetFailure
        } else {
            TerminalStatus::Success
        };
        debug!(factory_new = self.factory_new, %status, "Touchlink RX window expired");
        self.finish(status)
    }
}
