//! Building and running a scenario.

use crate::config::{Procedure, ScenarioConfig, Step};
use anyhow::{Context, Result};
use bdb_controller::{BootInfo, CommissioningController, ControllerConfig};
use bdb_core::Notification;
use bdb_finding_binding::FindBindConfig;
use bdb_simulation::{
    MemoryKeyStore, Responder, ScriptedStack, ScriptedTarget, SimulationRunner, SimulationStats,
    TrustCenterScript,
};
use bdb_steering::SteeringConfig;
use bdb_touchlink::TouchlinkConfig;
use bdb_types::{Channel, ClusterId, CommissioningSettings, Endpoint, SimpleDescriptor, TerminalStatus};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Result of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub procedure: Procedure,
    pub started_at: Duration,
    pub finished_at: Duration,

    /// Commissioning results reported during the step, in order.
    pub results: Vec<TerminalStatus>,

    /// The controller was idle when the step ended.
    pub completed: bool,
}

impl StepOutcome {
    /// The result the step ended with.
    pub fn final_result(&self) -> Option<TerminalStatus> {
        self.results.last().copied()
    }
}

/// Everything a scenario run produced.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: String,
    pub steps: Vec<StepOutcome>,
    pub notifications: Vec<(Duration, Notification)>,
    pub stats: SimulationStats,
    pub finished_at: Duration,
}

impl ScenarioReport {
    /// Check if every step returned the controller to idle.
    pub fn all_completed(&self) -> bool {
        self.steps.iter().all(|s| s.completed)
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scenario: {}", self.name)?;
        for (i, step) in self.steps.iter().enumerate() {
            let result = match step.final_result() {
                Some(status) => status.to_string(),
                None => "-".to_string(),
            };
            writeln!(
                f,
                "  step {}: {:?} at {:?} -> {} ({:?}){}",
                i + 1,
                step.procedure,
                step.started_at,
                result,
                step.finished_at.saturating_sub(step.started_at),
                if step.completed { "" } else { " [did not finish]" }
            )?;
        }
        writeln!(f, "Notifications:")?;
        for (time, notification) in &self.notifications {
            writeln!(f, "  {:>10?}  {:?}", time, notification)?;
        }
        write!(
            f,
            "Events: {}, stack requests: {}, timers set: {}, finished at {:?}",
            self.stats.events_processed,
            self.stats.stack_requests,
            self.stats.timers_set,
            self.finished_at
        )
    }
}

/// A scenario ready to run.
pub struct Scenario {
    config: ScenarioConfig,
    runner: SimulationRunner<ScriptedStack>,
}

impl Scenario {
    /// Build the controller and stack for `config` and run init.
    pub fn new(config: ScenarioConfig) -> Result<Self> {
        let controller = build_controller(&config)?;
        let stack = build_stack(&config)?;
        let mut runner = SimulationRunner::new(controller, stack);

        let device = &config.device;
        if let Some(channel) = device.formation_channel {
            runner
                .invoke(|c| {
                    c.set_formation_channel(Some(Channel(channel)))?;
                    Ok(vec![])
                })
                .context("formation channel")?;
        }

        let boot = match device.persisted_network {
            Some(network) => BootInfo::on_network(network, device.cold_start),
            None => BootInfo::factory_new(),
        };
        let descriptor = local_descriptor(&config);
        let settings = settings(&config);
        runner
            .invoke(|c| c.init(descriptor, settings, boot))
            .context("init")?;

        Ok(Self { config, runner })
    }

    pub fn runner(&self) -> &SimulationRunner<ScriptedStack> {
        &self.runner
    }

    /// Run init and every step. No step may take longer than `step_limit`.
    pub fn run(mut self, step_limit: Duration) -> Result<ScenarioReport> {
        let limit = self.runner.now() + step_limit;
        self.runner.settle(limit).context("init did not finish")?;
        info!(name = self.config.display_name(), steps = self.config.steps.len(), "Running scenario");

        let steps = self.config.steps.clone();
        let mut outcomes = Vec::with_capacity(steps.len());
        for (i, step) in steps.iter().enumerate() {
            let outcome = self
                .run_step(step, step_limit)
                .with_context(|| format!("step {} ({:?})", i + 1, step.procedure))?;
            outcomes.push(outcome);
        }

        Ok(ScenarioReport {
            name: self.config.display_name().to_string(),
            steps: outcomes,
            notifications: self.runner.notifications().to_vec(),
            stats: self.runner.stats().clone(),
            finished_at: self.runner.now(),
        })
    }

    fn run_step(&mut self, step: &Step, step_limit: Duration) -> Result<StepOutcome> {
        let delay = step.delay()?;
        if !delay.is_zero() {
            let until = self.runner.now() + delay;
            self.runner.run_until(until);
        }

        let started_at = self.runner.now();
        let reported = self.runner.commissioning_results().len();
        let role = step.role;
        info!(procedure = ?step.procedure, %role, time = ?started_at, "Starting step");

        match step.procedure {
            Procedure::Steer => self.runner.invoke(|c| c.start_network_steering()),
            Procedure::Form => self.runner.invoke(|c| c.start_network_formation()),
            Procedure::Touchlink => self.runner.invoke(|c| c.start_touchlink(role)),
            Procedure::FindBind => self.runner.invoke(|c| c.start_finding_binding(role)),
            Procedure::Reset => self.runner.invoke(|c| c.reset()),
            Procedure::FactoryReset => self.runner.invoke(|c| c.reset_to_factory_new()),
        }?;

        let completed = match self.runner.settle(started_at + step_limit) {
            Ok(()) => true,
            Err(e) => {
                warn!(procedure = ?step.procedure, error = %e, "Step did not finish");
                false
            }
        };
        let results = self.runner.commissioning_results()[reported..].to_vec();
        Ok(StepOutcome {
            procedure: step.procedure,
            started_at,
            finished_at: self.runner.now(),
            results,
            completed,
        })
    }
}

fn build_controller(config: &ScenarioConfig) -> Result<CommissioningController> {
    let device = &config.device;
    let mut controller_config =
        ControllerConfig::new(device.device_type, device.ieee_address).with_seed(config.seed);
    if let Some(retries) = device.join_retries {
        controller_config =
            controller_config.with_steering(SteeringConfig::with_retry_attempts(retries));
    }
    if let Some(identify_time) = device.identify_time {
        controller_config =
            controller_config.with_find_bind(FindBindConfig::with_identify_time(identify_time));
    }
    if let Some(touchlink) = &config.touchlink {
        if let Some(scan_time_base) = touchlink.scan_time_base()? {
            controller_config = controller_config.with_touchlink(TouchlinkConfig {
                scan_time_base,
                ..Default::default()
            });
        }
    }

    let mut key_store = MemoryKeyStore::new();
    if let Some(code) = device.install_code()? {
        key_store = key_store.with_install_code(code);
    }
    Ok(CommissioningController::new(
        controller_config,
        Arc::new(key_store),
    ))
}

fn build_stack(config: &ScenarioConfig) -> Result<ScriptedStack> {
    let section = &config.stack;
    let mut stack = ScriptedStack::new().with_join_results(section.join_results.iter().copied());
    if let Some(latency) = section.latency()? {
        stack = stack.with_latency(latency);
    }
    for network in &section.networks {
        stack = stack.with_network(*network);
    }
    if let Some(tc) = &section.trust_center {
        let script = match tc.key()? {
            Some(key) => TrustCenterScript::new(tc.address, key),
            None => TrustCenterScript::silent(tc.address),
        };
        stack = stack.with_trust_center(script.with_stack_revision(tc.stack_revision));
    }
    stack = stack.with_energies(
        section
            .energies
            .iter()
            .map(|e| (Channel(e.channel), e.energy))
            .collect(),
    );
    for responder in &section.responders {
        let descriptor = SimpleDescriptor::new(Endpoint(responder.endpoint), 0x0100)
            .with_in_clusters(responder.in_clusters.iter().copied().map(ClusterId));
        stack = stack.with_responder(
            Responder::new(responder.network_address(), responder.ieee, descriptor)
                .with_identify_time(responder.identify_time),
        );
    }
    for target in &section.targets {
        let mut scripted =
            ScriptedTarget::new(target.ieee, Channel(target.channel)).with_lqi(target.lqi);
        if !target.accept {
            scripted = scripted.rejecting();
        }
        stack = stack.with_target(scripted);
    }
    if !section.leave_confirm {
        stack = stack.without_leave_confirm();
    }
    if let Some(network) = config.device.persisted_network {
        stack = stack.with_persisted_network(network);
    }
    Ok(stack)
}

fn local_descriptor(config: &ScenarioConfig) -> SimpleDescriptor {
    let (in_clusters, out_clusters) = config.device.clusters();
    SimpleDescriptor::new(config.device.endpoint(), 0x0000)
        .with_in_clusters(in_clusters)
        .with_out_clusters(out_clusters)
}

fn settings(config: &ScenarioConfig) -> CommissioningSettings {
    match &config.touchlink {
        Some(touchlink) => CommissioningSettings::default()
            .with_touchlink(touchlink.channel(), touchlink.lqi_threshold),
        None => CommissioningSettings::default(),
    }
}
