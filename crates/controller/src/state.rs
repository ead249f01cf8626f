//! Commissioning controller state machine.

use crate::{BdbState, CommissioningContext, ControllerConfig, ControllerError};
use bdb_core::{Action, Event, KeyStore, Notification, StackRequest, StateMachine, TimerId};
use bdb_finding_binding::FindingBinding;
use bdb_formation::NetworkFormation;
use bdb_steering::NetworkSteering;
use bdb_tclk::TcLinkKeyExchange;
use bdb_touchlink::Touchlink;
use bdb_types::{
    CommissioningAttributes, CommissioningMode, CommissioningRole, CommissioningSettings,
    CommissioningStatus, DeviceType, LinkKeyType, NetworkAddress, NetworkInfo, NetworkType,
    NodeCapability, ReportingConfig, ScanRequest, SimpleDescriptor, StackStatus, TerminalStatus,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Top-level BDB commissioning state machine.
///
/// Owns the commissioning context and attributes, and every sub-procedure.
/// Only one sub-procedure runs at a time; a start request is accepted only
/// while [`is_idle`](Self::is_idle) holds.
pub struct CommissioningController {
    pub(crate) config: ControllerConfig,

    pub(crate) ctx: CommissioningContext,

    pub(crate) attrs: CommissioningAttributes,

    /// Commissioning endpoint, supplied at init.
    pub(crate) descriptor: Option<SimpleDescriptor>,

    pub(crate) settings: CommissioningSettings,

    pub(crate) key_store: Arc<dyn KeyStore>,

    pub(crate) steering: NetworkSteering,
    pub(crate) tclk: TcLinkKeyExchange,
    pub(crate) formation: NetworkFormation,
    pub(crate) touchlink: Touchlink,
    pub(crate) find_bind: FindingBinding,

    /// Default reporting entries added so far.
    pub(crate) reporting: Vec<ReportingConfig>,

    now: Duration,
}

impl CommissioningController {
    pub fn new(config: ControllerConfig, key_store: Arc<dyn KeyStore>) -> Self {
        let steering = NetworkSteering::new(config.steering.clone(), config.device_type);
        let tclk = TcLinkKeyExchange::new(config.tclk.clone(), Arc::clone(&key_store));
        let formation =
            NetworkFormation::new(config.formation.clone(), config.device_type, config.seed);
        let touchlink = Touchlink::new(
            config.touchlink.clone(),
            config.device_type,
            config.ieee_address,
            config.seed.wrapping_add(1),
        );
        let find_bind = FindingBinding::new(config.find_bind.clone());

        Self {
            config,
            ctx: CommissioningContext::default(),
            attrs: CommissioningAttributes::default(),
            descriptor: None,
            settings: CommissioningSettings::default(),
            key_store,
            steering,
            tclk,
            formation,
            touchlink,
            find_bind,
            reporting: Vec::new(),
            now: Duration::ZERO,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Public API
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn state(&self) -> BdbState {
        self.ctx.state
    }

    /// Check if a new procedure may start.
    pub fn is_idle(&self) -> bool {
        self.ctx.state == BdbState::Idle && !self.attrs.commissioning_status.is_in_progress()
    }

    pub fn context(&self) -> &CommissioningContext {
        &self.ctx
    }

    pub fn attributes(&self) -> &CommissioningAttributes {
        &self.attrs
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Run the procedures selected by `mode`.
    ///
    /// Order: touchlink (initiator), else steering, then formation, then
    /// finding & binding. The result arrives as a
    /// [`Notification::Commissioning`].
    pub fn start_commissioning(
        &mut self,
        mode: CommissioningMode,
        role: CommissioningRole,
    ) -> Result<Vec<Action>, ControllerError> {
        self.ensure_idle()?;
        self.attrs.commissioning_mode = mode;
        self.ctx.role = role;
        Ok(self.on_commissioning_start())
    }

    pub fn start_network_steering(&mut self) -> Result<Vec<Action>, ControllerError> {
        self.start_commissioning(CommissioningMode::NETWORK_STEERING, CommissioningRole::None)
    }

    pub fn start_network_formation(&mut self) -> Result<Vec<Action>, ControllerError> {
        self.start_commissioning(CommissioningMode::NETWORK_FORMATION, CommissioningRole::None)
    }

    /// Start touchlink. Steering stays selected for the no-response fallback.
    pub fn start_touchlink(
        &mut self,
        role: CommissioningRole,
    ) -> Result<Vec<Action>, ControllerError> {
        self.start_commissioning(
            CommissioningMode::TOUCHLINK | CommissioningMode::NETWORK_STEERING,
            role,
        )
    }

    pub fn start_finding_binding(
        &mut self,
        role: CommissioningRole,
    ) -> Result<Vec<Action>, ControllerError> {
        self.start_commissioning(CommissioningMode::FINDING_BINDING, role)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Commissioning Chain
    // ═══════════════════════════════════════════════════════════════════════════

    pub(crate) fn ensure_idle(&self) -> Result<(), ControllerError> {
        if !self.ctx.initialized {
            return Err(ControllerError::NotInitialized);
        }
        if !self.is_idle() {
            warn!(state = %self.ctx.state, "Rejecting request, commissioning busy");
            return Err(ControllerError::IllegalRequest {
                state: self.ctx.state,
            });
        }
        Ok(())
    }

    fn on_commissioning_start(&mut self) -> Vec<Action> {
        self.attrs.commissioning_status = CommissioningStatus::InProgress;
        self.ctx.detail = None;
        let mode = self.attrs.commissioning_mode;
        info!(?mode, role = %self.ctx.role, "Commissioning started");

        if mode.contains(CommissioningMode::TOUCHLINK) {
            let capable = self.settings.touchlink_enabled
                && self
                    .attrs
                    .node_commissioning_capability
                    .contains(NodeCapability::TOUCHLINK);
            if self.ctx.role == CommissioningRole::Initiator && capable {
                self.ctx.state = BdbState::CommissioningTouchlink;
                return self
                    .touchlink
                    .start_initiator(self.ctx.factory_new, self.ctx.network);
            }
            // The target listens from init on; there is nothing to start.
            return self.report_no_network();
        }

        match self.commission_steering() {
            Some(actions) => actions,
            None => self.report_no_network(),
        }
    }

    fn commission_steering(&mut self) -> Option<Vec<Action>> {
        if !self
            .attrs
            .commissioning_mode
            .contains(CommissioningMode::NETWORK_STEERING)
        {
            return self.commission_formation();
        }
        self.ctx.state = BdbState::CommissioningNetworkSteer;
        self.ctx.detail = None;
        Some(self.steering.start(&mut self.attrs))
    }

    fn commission_formation(&mut self) -> Option<Vec<Action>> {
        if !self
            .attrs
            .commissioning_mode
            .contains(CommissioningMode::NETWORK_FORMATION)
            || self.attrs.node_is_on_a_network
        {
            return self.commission_find_bind();
        }
        self.ctx.state = BdbState::CommissioningNetworkFormation;
        self.ctx.detail = None;
        Some(self.formation.start(&mut self.attrs))
    }

    fn commission_find_bind(&mut self) -> Option<Vec<Action>> {
        if !self
            .attrs
            .commissioning_mode
            .contains(CommissioningMode::FINDING_BINDING)
            || !self.attrs.node_is_on_a_network
        {
            return None;
        }
        let own_address = self.own_address();
        let descriptor = self.descriptor.as_ref()?;

        self.ctx.state = BdbState::CommissioningFindOrBind;
        self.ctx.detail = None;
        let actions = match self.ctx.role {
            CommissioningRole::Target => {
                self.find_bind.start_target(descriptor.endpoint, own_address)
            }
            CommissioningRole::Initiator | CommissioningRole::None => self
                .find_bind
                .start_initiator(descriptor, self.attrs.commissioning_group_id),
        };
        Some(actions)
    }

    fn report_no_network(&mut self) -> Vec<Action> {
        info!(mode = ?self.attrs.commissioning_mode, role = %self.ctx.role, "Nothing to commission");
        self.ctx.state = BdbState::Idle;
        self.ctx.status = TerminalStatus::NoNetwork;
        self.ctx.detail = None;
        self.attrs.commissioning_status = CommissioningStatus::Finished(TerminalStatus::NoNetwork);
        vec![Action::Notify(Notification::Commissioning {
            status: TerminalStatus::NoNetwork,
            detail: None,
        })]
    }

    /// Report the recorded status and return to idle.
    fn confirm(&mut self) -> Vec<Action> {
        let status = self.ctx.status;
        let detail = self.ctx.detail.take();
        self.ctx.state = BdbState::Idle;
        self.attrs.commissioning_status = CommissioningStatus::Finished(status);
        info!(%status, ?detail, "Commissioning finished");

        let mut actions = self.find_bind.abort();
        actions.push(Action::Notify(Notification::Commissioning { status, detail }));

        if status.is_success() {
            if let Some(network) = self.ctx.network {
                self.ctx.channel = Some(network.channel);
            }
        } else if self.ctx.factory_new
            && self.touchlink.is_target_enabled()
            && self
                .attrs
                .node_commissioning_capability
                .contains(NodeCapability::TOUCHLINK)
        {
            // Back to the touchlink listen channel.
            if let Some(channel) = self.ctx.channel {
                actions.push(Action::Stack(StackRequest::SetChannel { channel }));
            }
        }
        actions
    }

    pub(crate) fn own_address(&self) -> NetworkAddress {
        self.ctx
            .network
            .map(|n| n.network_address)
            .unwrap_or(self.config.network_address)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Sub-procedure Results
    // ═══════════════════════════════════════════════════════════════════════════

    fn on_touchlink_no_response(&mut self) -> Vec<Action> {
        if self.ctx.state != BdbState::CommissioningTouchlink {
            debug!(state = %self.ctx.state, "Ignoring stale touchlink no-response");
            return vec![];
        }
        info!("No touchlink scan response, falling back to network steering");

        self.attrs.commissioning_mode.remove(CommissioningMode::TOUCHLINK);
        self.ctx.state = BdbState::Idle;
        self.ctx.status = TerminalStatus::NoScanResponse;
        self.attrs.commissioning_status =
            CommissioningStatus::Finished(TerminalStatus::NoScanResponse);
        self.ctx.role = match self.config.device_type {
            DeviceType::EndDevice => CommissioningRole::Initiator,
            _ => CommissioningRole::Target,
        };

        let mut actions = vec![Action::Stack(StackRequest::ConfigureScan {
            channels: self.attrs.scan_channels(),
            duration: self.attrs.scan_duration,
        })];
        actions.extend(self.on_commissioning_start());
        actions
    }

    fn on_touchlink_finished(&mut self, status: TerminalStatus) -> Vec<Action> {
        if self.ctx.state != BdbState::CommissioningTouchlink {
            debug!(%status, state = %self.ctx.state, "Ignoring stale touchlink result");
            return vec![];
        }
        self.ctx.status = status;
        self.confirm()
    }

    fn on_touchlink_scan_request(&mut self, request: ScanRequest) -> Vec<Action> {
        let target_running = self.ctx.state == BdbState::CommissioningTouchlink
            && self.ctx.role == CommissioningRole::Target;
        if self.ctx.state != BdbState::Idle && !target_running {
            debug!(source = %request.source, state = %self.ctx.state, "Busy, ignoring touchlink scan request");
            return vec![];
        }

        let actions =
            self.touchlink
                .on_scan_request(request, self.ctx.factory_new, self.ctx.network);
        if self.touchlink.is_target_active() && !target_running {
            info!(initiator = %request.source, "Touchlink target started");
            self.ctx.state = BdbState::CommissioningTouchlink;
            self.ctx.role = CommissioningRole::Target;
            self.ctx.detail = None;
            self.attrs.commissioning_mode.insert(CommissioningMode::TOUCHLINK);
            self.attrs.commissioning_status = CommissioningStatus::InProgress;
        }
        actions
    }

    fn on_retrieve_tc_link_key(&mut self) -> Vec<Action> {
        if self.ctx.state != BdbState::CommissioningNetworkSteer {
            debug!(state = %self.ctx.state, "Ignoring stale TC link key retrieval");
            return vec![];
        }
        match self.ctx.trust_center {
            Some(trust_center) => {
                self.tclk
                    .start(&mut self.attrs, trust_center, self.config.ieee_address)
            }
            None => {
                warn!("Trust center address unknown, skipping TC link key exchange");
                vec![Action::EnqueueInternal {
                    event: Event::NetworkSteerPermitJoin,
                }]
            }
        }
    }

    fn on_steer_finished(
        &mut self,
        status: TerminalStatus,
        detail: Option<bdb_types::CommissioningDetail>,
    ) -> Vec<Action> {
        if self.ctx.state != BdbState::CommissioningNetworkSteer {
            debug!(%status, state = %self.ctx.state, "Ignoring stale steering result");
            return vec![];
        }
        info!(%status, ?detail, "Network steering finished");

        let mut actions = self.steering.abort();
        if status == TerminalStatus::TclkExFailure {
            self.ctx.network = None;
            self.ctx.trust_center = None;
        }
        self.ctx.status = status;
        self.ctx.detail = detail;

        match self.commission_formation() {
            Some(next) => actions.extend(next),
            None => actions.extend(self.confirm()),
        }
        actions
    }

    fn on_formation_finished(&mut self, status: TerminalStatus) -> Vec<Action> {
        if self.ctx.state != BdbState::CommissioningNetworkFormation {
            debug!(%status, state = %self.ctx.state, "Ignoring stale formation result");
            return vec![];
        }
        info!(%status, "Network formation finished");
        self.ctx.status = status;

        match self.commission_find_bind() {
            Some(actions) => actions,
            None => self.confirm(),
        }
    }

    fn on_find_bind_finished(&mut self, status: TerminalStatus) -> Vec<Action> {
        if self.ctx.state != BdbState::CommissioningFindOrBind {
            debug!(%status, state = %self.ctx.state, "Ignoring stale finding & binding result");
            return vec![];
        }
        info!(%status, "Finding & binding finished");
        self.ctx.status = status;
        self.confirm()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Stack Confirms
    // ═══════════════════════════════════════════════════════════════════════════

    fn on_timer(&mut self, id: TimerId) -> Vec<Action> {
        match id {
            TimerId::Steering => self.steering.on_timer(),
            TimerId::TcLinkKey => self.tclk.on_timer(&mut self.attrs),
            TimerId::Touchlink => self.touchlink.on_timer(),
            TimerId::FindBind => {
                let own_address = self.own_address();
                self.find_bind.on_timer(own_address)
            }
            TimerId::Reset => {
                if !self.ctx.leave_in_progress {
                    debug!("Ignoring stale reset timer");
                    return vec![];
                }
                warn!("No leave confirm, resetting anyway");
                self.finish_factory_reset()
            }
        }
    }

    fn on_start_device_confirm(
        &mut self,
        status: StackStatus,
        network: Option<NetworkInfo>,
    ) -> Vec<Action> {
        match self.ctx.state {
            BdbState::Init => {
                let success = status.is_success();
                if success && network.is_some() {
                    self.ctx.network = network;
                }
                debug!(%status, "Stack started");
                vec![Action::EnqueueInternal {
                    event: Event::InitDone { success },
                }]
            }
            BdbState::Idle | BdbState::DirectJoin => self.on_rejoin(status, network),
            BdbState::CommissioningTouchlink => {
                let network = network.map(|n| NetworkInfo {
                    network_type: NetworkType::Distributed,
                    ..n
                });
                if status.is_success() {
                    self.ctx.network = network;
                    self.ctx.trust_center = None;
                    self.ctx.factory_new = false;
                    self.attrs.node_join_link_key_type = LinkKeyType::Touchlink;
                    self.steering
                        .remember_network(network.map(|n| n.extended_pan_id));
                }
                self.touchlink
                    .on_start_device_confirm(&mut self.attrs, status, network)
            }
            state => {
                debug!(%status, %state, "Ignoring start confirm");
                vec![]
            }
        }
    }

    /// Unsolicited rejoin, or the answer to a direct join.
    fn on_rejoin(&mut self, status: StackStatus, network: Option<NetworkInfo>) -> Vec<Action> {
        let mut actions = Vec::new();
        let result = if status.is_success() {
            let changed = match (self.ctx.network, network) {
                (Some(old), Some(new)) => old != new,
                (_, new) => new.is_some(),
            };
            self.attrs.node_is_on_a_network = true;
            self.ctx.factory_new = false;
            if network.is_some() {
                self.ctx.network = network;
            }
            self.steering
                .remember_network(self.ctx.network.map(|n| n.extended_pan_id));
            if changed || self.ctx.force_join {
                actions.push(Action::Stack(StackRequest::SaveNetworkInfo));
            }
            TerminalStatus::Success
        } else if status == StackStatus::NetworkLost {
            TerminalStatus::ParentLost
        } else {
            TerminalStatus::RejoinFailure
        };
        info!(%status, %result, force_join = self.ctx.force_join, "Rejoin finished");

        self.ctx.force_join = false;
        self.ctx.state = BdbState::RejoinDone;
        actions.push(Action::EnqueueInternal {
            event: Event::RejoinDone { status: result },
        });
        actions
    }

    fn on_rejoin_done(&mut self, status: TerminalStatus) -> Vec<Action> {
        if self.ctx.state != BdbState::RejoinDone {
            debug!(%status, state = %self.ctx.state, "Ignoring stale rejoin result");
            return vec![];
        }
        self.ctx.status = status;
        self.ctx.detail = None;
        self.confirm()
    }

    fn on_leave_confirm(&mut self, status: StackStatus) -> Vec<Action> {
        match self.ctx.state {
            BdbState::CommissioningBusy if self.ctx.leave_in_progress => {
                debug!(%status, "Left network for factory reset");
                let mut actions = vec![Action::CancelTimer {
                    id: TimerId::Reset,
                }];
                actions.extend(self.finish_factory_reset());
                actions
            }
            BdbState::CommissioningNetworkSteer => {
                self.tclk.on_leave_confirm(&mut self.attrs, status)
            }
            state => {
                debug!(%status, %state, "Ignoring leave confirm");
                vec![]
            }
        }
    }

    fn on_init_done(&mut self, success: bool) -> Vec<Action> {
        if self.ctx.state != BdbState::Init {
            debug!(success, state = %self.ctx.state, "Ignoring stale init result");
            return vec![];
        }
        self.ctx.state = BdbState::Idle;
        let joined_network = self.attrs.node_is_on_a_network;
        info!(success, joined_network, "Init finished");

        let mut actions = vec![Action::Notify(Notification::Init {
            success,
            joined_network,
        })];
        if success && joined_network && self.ctx.force_join {
            actions.push(Action::Stack(StackRequest::SaveNetworkInfo));
        }
        self.ctx.force_join = false;
        actions
    }
}

impl StateMachine for CommissioningController {
    fn handle(&mut self, event: Event) -> Vec<Action> {
        trace!(event = event.type_name(), state = %self.ctx.state, "Handling event");

        match event {
            Event::TimerFired { id } => self.on_timer(id),

            Event::StartDeviceConfirm { status, network } => {
                self.on_start_device_confirm(status, network)
            }
            Event::LeaveConfirm { status } => self.on_leave_confirm(status),

            Event::NetworkDiscoveryConfirm { status, networks } => {
                self.steering
                    .on_discovery_confirm(&mut self.attrs, status, networks)
            }
            Event::JoinConfirm {
                status,
                network,
                trust_center,
            } => {
                if self.ctx.state == BdbState::CommissioningNetworkSteer && status.is_success() {
                    self.ctx.network = network;
                    self.ctx.trust_center = trust_center;
                    self.ctx.factory_new = false;
                }
                self.steering
                    .on_join_confirm(&mut self.attrs, status, network, trust_center)
            }

            Event::NodeDescriptorResponse {
                status,
                source,
                server_mask,
            } => self
                .tclk
                .on_node_descriptor_response(status, source, server_mask),
            Event::TcLinkKeyReceived { trust_center, key } => {
                self.tclk.on_key_received(&mut self.attrs, trust_center, key)
            }
            Event::VerifyKeyConfirm { status } => {
                self.tclk.on_verify_confirm(&mut self.attrs, status)
            }

            Event::EnergyScanConfirm { status, energies } => {
                self.formation
                    .on_energy_scan_confirm(&mut self.attrs, status, energies)
            }
            Event::FormationConfirm { status, network } => {
                if self.ctx.state == BdbState::CommissioningNetworkFormation && status.is_success()
                {
                    self.ctx.network = network;
                    self.ctx.factory_new = false;
                    if network.map(|n| n.network_type) == Some(NetworkType::Centralized) {
                        self.ctx.trust_center = Some(self.config.ieee_address);
                    }
                }
                self.formation
                    .on_formation_confirm(&mut self.attrs, status, network)
            }

            Event::TouchlinkScanRequestReceived { request } => {
                self.on_touchlink_scan_request(request)
            }
            Event::TouchlinkScanResponseReceived { response } => {
                self.touchlink.on_scan_response(response)
            }
            Event::TouchlinkNetworkRequestReceived {
                source,
                transaction_id,
                kind,
                params,
            } => self
                .touchlink
                .on_network_request(source, transaction_id, kind, params),
            Event::TouchlinkNetworkResponseReceived {
                source,
                transaction_id,
                success,
                ..
            } => self
                .touchlink
                .on_network_response(source, transaction_id, success),

            Event::IdentifyQueryResponse {
                source,
                endpoint,
                timeout,
            } => self
                .find_bind
                .on_identify_query_response(source, endpoint, timeout),
            Event::IdentifyQueryReceived { source, .. } => {
                self.find_bind.on_identify_query_received(source)
            }
            Event::IdentifyTimeChanged {
                endpoint,
                remaining,
            } => self.find_bind.on_identify_time_changed(endpoint, remaining),
            Event::SimpleDescriptorResponse {
                status,
                source,
                descriptor,
            } => self
                .find_bind
                .on_simple_descriptor_response(status, source, descriptor),
            Event::IeeeAddressResponse {
                status,
                source,
                ieee,
            } => self.find_bind.on_ieee_address_response(status, source, ieee),
            Event::BindConfirm { status } => self.find_bind.on_bind_confirm(status),

            Event::InitDone { success } => self.on_init_done(success),
            Event::CommissioningStart => {
                if self.ctx.state != BdbState::Idle {
                    debug!(state = %self.ctx.state, "Ignoring commissioning start while busy");
                    return vec![];
                }
                self.on_commissioning_start()
            }
            Event::TouchlinkNoResponse => self.on_touchlink_no_response(),
            Event::TouchlinkFinished { status } => self.on_touchlink_finished(status),
            Event::NetworkSteerPermitJoin => {
                if self.ctx.state != BdbState::CommissioningNetworkSteer {
                    debug!(state = %self.ctx.state, "Ignoring stale steering permit-join");
                    return vec![];
                }
                self.steering.on_permit_join()
            }
            Event::NetworkSteerRetrieveTcLinkKey => self.on_retrieve_tc_link_key(),
            Event::NetworkSteerFinished { status, detail } => {
                self.on_steer_finished(status, detail)
            }
            Event::NetworkFormationPermitJoin => {
                if self.ctx.state != BdbState::CommissioningNetworkFormation {
                    debug!(state = %self.ctx.state, "Ignoring stale formation permit-join");
                    return vec![];
                }
                // A formed network is steered from now on.
                self.attrs
                    .commissioning_mode
                    .insert(CommissioningMode::NETWORK_STEERING);
                self.formation.on_permit_join()
            }
            Event::NetworkFormationFinished { status } => self.on_formation_finished(status),
            Event::FindOrBindSimpleDescReq => self.find_bind.on_simple_desc_req(),
            Event::FindOrBindFinished { status } => self.on_find_bind_finished(status),
            Event::RejoinDone { status } => self.on_rejoin_done(status),
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
        self.steering.set_time(now);
        self.tclk.set_time(now);
        self.formation.set_time(now);
        self.touchlink.set_time(now);
        self.find_bind.set_time(now);
    }

    fn now(&self) -> Duration {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BootInfo;
    use bdb_core::KeyStoreError;
    use bdb_types::{
        Channel, ChannelMask, ClusterId, Endpoint, ExtendedAddress, ExtendedPanId, InstallCode,
        LinkKey, PanId,
    };
    use tracing_test::traced_test;

    struct NoKeys;

    impl KeyStore for NoKeys {
        fn load_install_code(&self) -> Result<InstallCode, KeyStoreError> {
            Err(KeyStoreError::NotFound)
        }

        fn find_device_key(&self, _device: ExtendedAddress) -> Option<LinkKey> {
            None
        }

        fn add_device_key(&self, _device: ExtendedAddress, _key: LinkKey) -> Result<(), KeyStoreError> {
            Err(KeyStoreError::Full)
        }
    }

    fn make_controller(device: DeviceType, settings: CommissioningSettings) -> CommissioningController {
        let mut controller = CommissioningController::new(
            ControllerConfig::new(device, ExtendedAddress(0x00_12_4b_00_0000_0042)),
            Arc::new(NoKeys),
        );
        let descriptor = SimpleDescriptor::new(Endpoint(1), 0x0103)
            .with_out_clusters([ClusterId::ON_OFF]);
        let actions = controller
            .init(descriptor, settings, BootInfo::factory_new())
            .unwrap();
        drain(&mut controller, actions);
        controller
    }

    fn drain(controller: &mut CommissioningController, actions: Vec<Action>) -> Vec<Action> {
        let mut pending = actions;
        let mut out = Vec::new();
        while !pending.is_empty() {
            let mut next = Vec::new();
            for action in pending {
                match action {
                    Action::EnqueueInternal { event } => next.extend(controller.handle(event)),
                    other => out.push(other),
                }
            }
            pending = next;
        }
        out
    }

    fn reported(actions: &[Action]) -> Vec<TerminalStatus> {
        actions
            .iter()
            .filter_map(|a| a.as_notification())
            .filter_map(|n| n.commissioning_status())
            .collect()
    }

    fn home_network(network_type: NetworkType) -> NetworkInfo {
        NetworkInfo {
            pan_id: PanId(0x1A62),
            extended_pan_id: ExtendedPanId(0x00AA_BBCC),
            channel: Channel(20),
            network_address: NetworkAddress(0x0000),
            network_type,
        }
    }

    #[traced_test]
    #[test]
    fn test_steering_without_channels_reports_no_network() {
        let mut controller = make_controller(DeviceType::Router, CommissioningSettings::default());
        controller.attrs.primary_channel_set = ChannelMask::EMPTY;
        controller.attrs.secondary_channel_set = ChannelMask::EMPTY;

        let actions = controller.start_network_steering().unwrap();
        let actions = drain(&mut controller, actions);
        assert_eq!(reported(&actions), vec![TerminalStatus::NoNetwork]);
        assert!(controller.is_idle());
        assert_eq!(
            controller.attributes().commissioning_status,
            CommissioningStatus::Finished(TerminalStatus::NoNetwork)
        );
    }

    #[traced_test]
    #[test]
    fn test_touchlink_target_start_reports_no_network() {
        let settings = CommissioningSettings::default().with_touchlink(Channel(11), 0xA0);
        let mut controller = make_controller(DeviceType::Router, settings);

        let actions = controller.start_touchlink(CommissioningRole::Target).unwrap();
        assert_eq!(reported(&actions), vec![TerminalStatus::NoNetwork]);
        assert!(controller.is_idle());
    }

    #[traced_test]
    #[test]
    fn test_touchlink_without_response_falls_back_to_steering() {
        let settings = CommissioningSettings::default().with_touchlink(Channel(11), 0xA0);
        let mut controller = make_controller(DeviceType::Router, settings);

        let actions = controller.start_touchlink(CommissioningRole::Initiator).unwrap();
        assert_eq!(controller.state(), BdbState::CommissioningTouchlink);
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::Stack(StackRequest::TouchlinkScanRequest { .. }))));

        let mut fired = 0;
        let mut last = Vec::new();
        while controller.state() == BdbState::CommissioningTouchlink && fired < 64 {
            let actions = controller.handle(Event::TimerFired {
                id: TimerId::Touchlink,
            });
            last = drain(&mut controller, actions);
            fired += 1;
        }

        assert_eq!(controller.state(), BdbState::CommissioningNetworkSteer);
        assert_eq!(controller.context().role, CommissioningRole::Target);
        assert!(!controller
            .attributes()
            .commissioning_mode
            .contains(CommissioningMode::TOUCHLINK));
        assert!(last.contains(&Action::Stack(StackRequest::ConfigureScan {
            channels: ChannelMask::ALL,
            duration: 3,
        })));
        assert!(last
            .iter()
            .any(|a| matches!(a, Action::Stack(StackRequest::NetworkDiscovery { .. }))));
        assert!(reported(&last).is_empty());
    }

    #[traced_test]
    #[test]
    fn test_lost_parent_is_reported() {
        let mut controller = make_controller(DeviceType::EndDevice, CommissioningSettings::default());
        let actions = controller.handle(Event::StartDeviceConfirm {
            status: StackStatus::NetworkLost,
            network: None,
        });
        let actions = drain(&mut controller, actions);
        assert_eq!(reported(&actions), vec![TerminalStatus::ParentLost]);
        assert!(controller.is_idle());
    }

    #[traced_test]
    #[test]
    fn test_failed_rejoin_is_reported() {
        let mut controller = make_controller(DeviceType::Router, CommissioningSettings::default());
        let actions = controller.handle(Event::StartDeviceConfirm {
            status: StackStatus::Failure,
            network: None,
        });
        let actions = drain(&mut controller, actions);
        assert_eq!(reported(&actions), vec![TerminalStatus::RejoinFailure]);
    }

    #[traced_test]
    #[test]
    fn test_coordinator_forms_then_finds_nobody() {
        let mut controller =
            make_controller(DeviceType::Coordinator, CommissioningSettings::default());
        let mode = CommissioningMode::NETWORK_FORMATION | CommissioningMode::FINDING_BINDING;

        let actions = controller
            .start_commissioning(mode, CommissioningRole::Initiator)
            .unwrap();
        assert_eq!(controller.state(), BdbState::CommissioningNetworkFormation);
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::Stack(StackRequest::EnergyScan { .. }))));

        let actions = controller.handle(Event::EnergyScanConfirm {
            status: StackStatus::Success,
            energies: vec![(Channel(11), 80), (Channel(20), 5), (Channel(21), 0)],
        });
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::Stack(StackRequest::FormNetwork { .. }))));

        let network = home_network(NetworkType::Centralized);
        let actions = controller.handle(Event::FormationConfirm {
            status: StackStatus::Success,
            network: Some(network),
        });
        let actions = drain(&mut controller, actions);
        assert_eq!(reported(&actions), vec![TerminalStatus::FormationDone]);
        assert!(actions.contains(&Action::Stack(StackRequest::SaveNetworkInfo)));
        assert!(actions.contains(&Action::Stack(StackRequest::IdentifyQuery {
            source_endpoint: Endpoint(1),
        })));
        assert_eq!(controller.state(), BdbState::CommissioningFindOrBind);
        assert!(controller
            .attributes()
            .commissioning_mode
            .contains(CommissioningMode::NETWORK_STEERING));
        assert_eq!(controller.context().trust_center, Some(controller.config().ieee_address));

        let actions = controller.handle(Event::TimerFired {
            id: TimerId::FindBind,
        });
        let actions = drain(&mut controller, actions);
        assert_eq!(reported(&actions), vec![TerminalStatus::NoIdentifyQueryResponse]);
        assert!(controller.is_idle());
        assert_eq!(controller.context().channel, None);
    }

    #[traced_test]
    #[test]
    fn test_steering_on_network_opens_it_and_finishes() {
        let mut controller = CommissioningController::new(
            ControllerConfig::new(DeviceType::Router, ExtendedAddress(7)),
            Arc::new(NoKeys),
        );
        let network = home_network(NetworkType::Distributed);
        let descriptor = SimpleDescriptor::new(Endpoint(1), 0x0100);
        let actions = controller
            .init(
                descriptor,
                CommissioningSettings::default(),
                BootInfo::on_network(network, false),
            )
            .unwrap();
        drain(&mut controller, actions);
        let actions = controller.handle(Event::StartDeviceConfirm {
            status: StackStatus::Success,
            network: Some(network),
        });
        drain(&mut controller, actions);
        assert!(controller.is_idle());

        let actions = controller.start_network_steering().unwrap();
        let actions = drain(&mut controller, actions);
        assert!(actions.contains(&Action::Stack(StackRequest::SaveNetworkInfo)));
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::Stack(StackRequest::LocalPermitJoin { .. }))));
        assert_eq!(reported(&actions), vec![TerminalStatus::Success]);
        assert_eq!(controller.context().channel, Some(Channel(20)));
    }

    #[traced_test]
    #[test]
    fn test_stale_internal_results_are_ignored() {
        let mut controller = make_controller(DeviceType::Router, CommissioningSettings::default());
        assert!(controller
            .handle(Event::NetworkSteerFinished {
                status: TerminalStatus::Success,
                detail: None,
            })
            .is_empty());
        assert!(controller
            .handle(Event::FindOrBindFinished {
                status: TerminalStatus::Success,
            })
            .is_empty());
        assert!(controller.handle(Event::TouchlinkNoResponse).is_empty());
        assert!(controller.is_idle());
    }
}
