//! Init, reset and the configuration entry points.

use crate::{BdbState, BootInfo, CommissioningController, CommissioningContext, ControllerError};
use bdb_core::{Action, Event, KeyStoreError, StackRequest, TimerId};
use bdb_types::{
    AttributeError, AttributeId, Channel, ClusterId, CommissioningSettings, CommissioningStatus,
    DeviceType, ExtendedAddress, FindBindDestination, InstallCode, LinkKey, LinkKeyType,
    NetworkInfo, NodeCapability, ReportingConfig, ReportingError, SimpleDescriptor,
};
use tracing::{debug, info, warn};

impl CommissioningController {
    // ═══════════════════════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════════════════════

    /// Bring the controller up. Callable once.
    ///
    /// A node that is not factory new restarts on its persisted network; the
    /// [`Notification::Init`](bdb_core::Notification::Init) callback follows
    /// the stack's start confirm. A factory-new node reports immediately.
    pub fn init(
        &mut self,
        descriptor: SimpleDescriptor,
        settings: CommissioningSettings,
        boot: BootInfo,
    ) -> Result<Vec<Action>, ControllerError> {
        if self.ctx.initialized {
            return Err(ControllerError::AlreadyInitialized);
        }
        info!(
            endpoint = %descriptor.endpoint,
            device = ?self.config.device_type,
            factory_new = boot.factory_new,
            touchlink = settings.touchlink_enabled,
            "Initializing commissioning"
        );
        self.descriptor = Some(descriptor);
        self.settings = settings;
        Ok(self.boot(boot))
    }

    /// Restart the stack on the persisted state. Only while idle.
    pub fn reset(&mut self) -> Result<Vec<Action>, ControllerError> {
        self.ensure_idle()?;
        info!("Resetting commissioning");
        let mut actions = self.abort_all();
        let boot = match self.ctx.network {
            Some(network) if !self.ctx.factory_new => BootInfo::on_network(network, true),
            _ => BootInfo::factory_new(),
        };
        actions.extend(self.boot(boot));
        Ok(actions)
    }

    /// Leave the network, erase persisted network data and re-init.
    ///
    /// The outgoing frame counter survives. A node off the network resets
    /// straight away; otherwise the reset waits for the leave confirm, or for
    /// `reset_leave_timeout` when none arrives.
    pub fn reset_to_factory_new(&mut self) -> Result<Vec<Action>, ControllerError> {
        self.ensure_idle()?;
        let mut actions = self.abort_all();

        if !self.attrs.node_is_on_a_network {
            info!("Resetting to factory new");
            actions.extend(self.finish_factory_reset());
            return Ok(actions);
        }

        info!("Leaving network before factory reset");
        self.ctx.state = BdbState::CommissioningBusy;
        self.ctx.leave_in_progress = true;
        actions.push(Action::Stack(StackRequest::Leave { rejoin: false }));
        actions.push(Action::SetTimer {
            id: TimerId::Reset,
            duration: self.config.reset_leave_timeout,
        });
        Ok(actions)
    }

    /// Join a known network without discovery.
    ///
    /// The stack answers with a start confirm, which is reported like a rejoin
    /// and persists the network.
    pub fn join_direct(
        &mut self,
        network: NetworkInfo,
        network_key: LinkKey,
        trust_center: Option<ExtendedAddress>,
    ) -> Result<Vec<Action>, ControllerError> {
        self.ensure_idle()?;
        info!(
            extended_pan_id = %network.extended_pan_id,
            channel = %network.channel,
            "Joining network directly"
        );
        self.ctx.state = BdbState::DirectJoin;
        self.attrs.commissioning_status = CommissioningStatus::InProgress;
        self.ctx.force_join = true;
        self.ctx.trust_center = trust_center;
        Ok(vec![Action::Stack(StackRequest::JoinFixedNetwork {
            network,
            network_key,
            trust_center,
        })])
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Configuration
    // ═══════════════════════════════════════════════════════════════════════════

    /// Store the link key derived from a joining device's install code.
    ///
    /// Invalid addresses and devices that already have a key are ignored.
    pub fn add_install_code(
        &mut self,
        device: ExtendedAddress,
        code: InstallCode,
    ) -> Result<(), ControllerError> {
        if !device.is_valid() {
            debug!(%device, "Ignoring install code for invalid address");
            return Ok(());
        }
        if self.key_store.find_device_key(device).is_some() {
            debug!(%device, "Device key already present");
            return Ok(());
        }
        let key = code.derive_link_key();
        self.key_store.add_device_key(device, key)?;
        info!(%device, "Install code key added");
        Ok(())
    }

    /// Read a BDB attribute by identifier.
    pub fn attribute(&self, id: u8) -> Result<Vec<u8>, AttributeError> {
        let id = AttributeId::try_from(id)?;
        Ok(self.attrs.get(id))
    }

    /// Write a BDB attribute by identifier.
    pub fn set_attribute(&mut self, id: u8, value: &[u8]) -> Result<(), AttributeError> {
        let id = AttributeId::try_from(id)?;
        self.attrs.set(id, value)?;
        debug!(?id, "Attribute written");
        Ok(())
    }

    /// Add a default reporting entry for a local attribute.
    pub fn default_reporting_config(
        &mut self,
        config: ReportingConfig,
    ) -> Result<Vec<Action>, ReportingError> {
        if self.reporting.iter().any(|c| c.key() == config.key()) {
            return Err(ReportingError::DuplicateExists {
                endpoint: config.endpoint,
                cluster: config.cluster,
                attribute_id: config.attribute_id,
            });
        }
        let supported = self
            .descriptor
            .as_ref()
            .map_or(false, |d| d.endpoint == config.endpoint && d.has_cluster(config.cluster));
        if !supported {
            return Err(ReportingError::UnsupportedAttribute {
                endpoint: config.endpoint,
                cluster: config.cluster,
            });
        }
        if config.max_interval != 0 && config.min_interval > config.max_interval {
            return Err(ReportingError::InvalidInterval {
                min: config.min_interval,
                max: config.max_interval,
            });
        }

        debug!(
            endpoint = %config.endpoint,
            cluster = %config.cluster,
            attribute_id = config.attribute_id,
            "Default reporting entry added"
        );
        self.reporting.push(config.clone());
        Ok(vec![Action::Stack(StackRequest::ConfigureReporting(config))])
    }

    /// Default reporting entries added so far.
    pub fn reporting(&self) -> &[ReportingConfig] {
        &self.reporting
    }

    /// Pin formation to one channel, or `None` to use the channel sets.
    pub fn set_formation_channel(&mut self, channel: Option<Channel>) -> Result<(), ControllerError> {
        if let Some(channel) = channel {
            if !channel.is_valid() {
                return Err(ControllerError::InvalidChannel(channel));
            }
        }
        self.formation.set_channel(channel);
        Ok(())
    }

    /// Join and form without network security.
    pub fn set_security_disabled(&mut self, disabled: bool) {
        self.ctx.security_disabled = disabled;
        self.steering.set_security_enabled(!disabled);
    }

    /// Restrict finding & binding to these clusters. Empty means all.
    pub fn set_match_clusters(&mut self, clusters: Vec<ClusterId>) {
        self.find_bind.set_match_clusters(clusters);
    }

    /// Queue a known identifying endpoint for the running initiator.
    pub fn add_identify_active_endpoint(
        &mut self,
        destination: FindBindDestination,
    ) -> Result<(), ControllerError> {
        if self.ctx.state != BdbState::CommissioningFindOrBind
            || !self.find_bind.is_initiator_active()
        {
            return Err(ControllerError::IllegalRequest {
                state: self.ctx.state,
            });
        }
        self.find_bind.add_responder(destination)?;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Internals
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configure the stack for this boot.
    pub(crate) fn boot(&mut self, boot: BootInfo) -> Vec<Action> {
        let security_disabled = self.ctx.security_disabled;
        self.ctx = CommissioningContext {
            state: BdbState::Init,
            factory_new: boot.factory_new,
            initialized: true,
            network: boot.network,
            security_disabled,
            ..CommissioningContext::default()
        };
        self.attrs.commissioning_status = CommissioningStatus::default();
        self.attrs.node_is_on_a_network = !boot.factory_new;

        let install_code_key = if boot.cold_start {
            self.load_install_code_key()
        } else {
            None
        };
        if install_code_key.is_some() {
            self.attrs.join_uses_install_code_key = true;
            self.attrs.node_join_link_key_type = LinkKeyType::InstallCode;
        }

        self.touchlink.configure(&self.settings);
        self.attrs.node_commissioning_capability =
            NodeCapability::for_device(self.config.device_type, self.settings.touchlink_enabled);

        let mut actions = vec![
            Action::Stack(StackRequest::ConfigureSecurity {
                enabled: !self.ctx.security_disabled,
                link_keys: self.settings.link_keys,
                install_code_key,
            }),
            Action::Stack(StackRequest::ConfigureScan {
                channels: self.attrs.scan_channels(),
                duration: self.attrs.scan_duration,
            }),
        ];

        if !boot.factory_new {
            self.steering
                .remember_network(boot.network.map(|n| n.extended_pan_id));
            actions.push(Action::Stack(StackRequest::StartDevice {
                cold_start: boot.cold_start,
            }));
            return actions;
        }

        self.steering.remember_network(None);
        if self.settings.touchlink_enabled && self.config.device_type != DeviceType::Coordinator {
            let channel = self.settings.touchlink_channel;
            self.ctx.channel = Some(channel);
            actions.push(Action::Stack(StackRequest::SetChannel { channel }));
        }
        actions.push(Action::EnqueueInternal {
            event: Event::InitDone { success: true },
        });
        actions
    }

    fn load_install_code_key(&self) -> Option<LinkKey> {
        match self.key_store.load_install_code() {
            Ok(code) if code.is_erased() => None,
            Ok(code) => {
                debug!("Joining with install code key");
                Some(code.derive_link_key())
            }
            Err(KeyStoreError::NotFound) => None,
            Err(e) => {
                warn!(error = %e, "Failed to load install code");
                None
            }
        }
    }

    pub(crate) fn finish_factory_reset(&mut self) -> Vec<Action> {
        self.ctx.leave_in_progress = false;
        self.ctx.state = BdbState::Idle;
        self.attrs.join_uses_install_code_key = false;
        self.attrs.node_join_link_key_type = LinkKeyType::TrustCenter;
        self.reporting.clear();

        let mut actions = vec![Action::Stack(StackRequest::ResetToFactoryNew)];
        actions.extend(self.boot(BootInfo::factory_new()));
        actions
    }

    fn abort_all(&mut self) -> Vec<Action> {
        let mut actions = self.steering.abort();
        actions.extend(self.tclk.abort(&mut self.attrs));
        self.formation.abort();
        actions.extend(self.touchlink.abort());
        actions.extend(self.find_bind.abort());
        actions
    }
}
