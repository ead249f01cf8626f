//! Scenario files.
//!
//! A scenario describes one device, the network around it and the
//! commissioning procedures to run, in TOML:
//!
//! ```toml
//! name = "steer onto a centralized network"
//! seed = 7
//!
//! [device]
//! device_type = "Router"
//! ieee_address = 0x00124B0000000001
//!
//! [[stack.networks]]
//! pan_id = 0x3C4D
//! extended_pan_id = 0x000D6F000AAABBBB
//! channel = 15
//! permit_joining = true
//! lqi = 200
//!
//! [stack.trust_center]
//! address = 0x00124B00000000C0
//! key = "5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a"
//!
//! [[steps]]
//! procedure = "steer"
//! ```

use anyhow::{bail, Context, Result};
use bdb_types::{
    Channel, ClusterId, CommissioningRole, DeviceType, Endpoint, ExtendedAddress, InstallCode,
    LinkKey, NetworkAddress, NetworkDescriptor, NetworkInfo, StackStatus, KEY_LEN,
};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// A complete scenario.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub name: Option<String>,

    /// Seed for the controller's random source.
    #[serde(default)]
    pub seed: u64,

    pub device: DeviceSection,

    /// Present when touchlink is enabled.
    #[serde(default)]
    pub touchlink: Option<TouchlinkSection>,

    #[serde(default)]
    pub stack: StackSection,

    #[serde(default)]
    pub steps: Vec<Step>,
}

/// The simulated node.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceSection {
    pub device_type: DeviceType,

    pub ieee_address: ExtendedAddress,

    /// Factory-programmed install code, as 32 hex digits.
    #[serde(default)]
    pub install_code: Option<String>,

    /// Network persisted from an earlier run. Absent means factory new.
    #[serde(default)]
    pub persisted_network: Option<NetworkInfo>,

    #[serde(default = "default_true")]
    pub cold_start: bool,

    #[serde(default = "default_endpoint")]
    pub endpoint: u8,

    #[serde(default)]
    pub in_clusters: Vec<u16>,

    #[serde(default)]
    pub out_clusters: Vec<u16>,

    /// Seconds a finding & binding target identifies for.
    #[serde(default)]
    pub identify_time: Option<u16>,

    /// Join retries against one network.
    #[serde(default)]
    pub join_retries: Option<u8>,

    /// Form on this channel only.
    #[serde(default)]
    pub formation_channel: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TouchlinkSection {
    #[serde(default = "default_touchlink_channel")]
    pub channel: u8,

    #[serde(default = "default_lqi_threshold")]
    pub lqi_threshold: u8,

    /// Dwell time per scan request, e.g. "250ms".
    #[serde(default)]
    pub scan_time_base: Option<String>,
}

/// What the scripted stack answers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackSection {
    /// Reply latency, e.g. "10ms".
    #[serde(default)]
    pub latency: Option<String>,

    #[serde(default)]
    pub networks: Vec<NetworkDescriptor>,

    /// Outcomes of successive join attempts; success once exhausted.
    #[serde(default)]
    pub join_results: Vec<StackStatus>,

    #[serde(default)]
    pub trust_center: Option<TrustCenterSection>,

    #[serde(default)]
    pub energies: Vec<EnergySection>,

    #[serde(default)]
    pub responders: Vec<ResponderSection>,

    #[serde(default)]
    pub targets: Vec<TargetSection>,

    /// Answer leave requests.
    #[serde(default = "default_true")]
    pub leave_confirm: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrustCenterSection {
    pub address: ExtendedAddress,

    /// Key handed out on request, as 32 hex digits. Absent means the trust
    /// center never answers.
    #[serde(default)]
    pub key: Option<String>,

    #[serde(default = "default_stack_revision")]
    pub stack_revision: u8,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnergySection {
    pub channel: u8,
    pub energy: u8,
}

/// An endpoint answering identify queries.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponderSection {
    pub address: u16,
    pub ieee: ExtendedAddress,
    pub endpoint: u8,

    #[serde(default)]
    pub in_clusters: Vec<u16>,

    #[serde(default = "default_identify_time")]
    pub identify_time: u16,
}

/// A touchlink target in range.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSection {
    pub ieee: ExtendedAddress,
    pub channel: u8,

    #[serde(default = "default_target_lqi")]
    pub lqi: u8,

    #[serde(default = "default_true")]
    pub accept: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Procedure {
    Steer,
    Form,
    Touchlink,
    FindBind,
    Reset,
    FactoryReset,
}

/// One procedure to run once the previous one has finished.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    pub procedure: Procedure,

    #[serde(default)]
    pub role: CommissioningRole,

    /// Quiet time before the step, e.g. "30s".
    #[serde(default)]
    pub after: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_endpoint() -> u8 {
    1
}

fn default_touchlink_channel() -> u8 {
    11
}

fn default_lqi_threshold() -> u8 {
    0xA0
}

fn default_stack_revision() -> u8 {
    22
}

fn default_identify_time() -> u16 {
    180
}

fn default_target_lqi() -> u8 {
    0xD0
}

impl ScenarioConfig {
    /// Parse a scenario from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: ScenarioConfig = toml::from_str(text).context("invalid scenario")?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed scenario")
    }

    fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            bail!("scenario has no steps");
        }
        if let Some(channel) = self.device.formation_channel {
            check_channel(channel, "device.formation_channel")?;
        }
        if let Some(touchlink) = &self.touchlink {
            check_channel(touchlink.channel, "touchlink.channel")?;
            touchlink.scan_time_base()?;
        }
        for target in &self.stack.targets {
            check_channel(target.channel, "stack.targets.channel")?;
        }
        self.device.install_code()?;
        self.stack.latency()?;
        if let Some(tc) = &self.stack.trust_center {
            tc.key()?;
        }
        for step in &self.steps {
            step.delay()?;
        }
        Ok(())
    }
}

impl DeviceSection {
    pub fn install_code(&self) -> Result<Option<InstallCode>> {
        self.install_code
            .as_deref()
            .map(|text| parse_key(text, "device.install_code").map(InstallCode))
            .transpose()
    }

    pub fn clusters(&self) -> (Vec<ClusterId>, Vec<ClusterId>) {
        (
            self.in_clusters.iter().copied().map(ClusterId).collect(),
            self.out_clusters.iter().copied().map(ClusterId).collect(),
        )
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint(self.endpoint)
    }
}

impl TouchlinkSection {
    pub fn channel(&self) -> Channel {
        Channel(self.channel)
    }

    pub fn scan_time_base(&self) -> Result<Option<Duration>> {
        self.scan_time_base
            .as_deref()
            .map(|text| parse_duration(text, "touchlink.scan_time_base"))
            .transpose()
    }
}

impl StackSection {
    pub fn latency(&self) -> Result<Option<Duration>> {
        self.latency
            .as_deref()
            .map(|text| parse_duration(text, "stack.latency"))
            .transpose()
    }
}

impl TrustCenterSection {
    pub fn key(&self) -> Result<Option<LinkKey>> {
        self.key
            .as_deref()
            .map(|text| parse_key(text, "stack.trust_center.key").map(LinkKey))
            .transpose()
    }
}

impl ResponderSection {
    pub fn network_address(&self) -> NetworkAddress {
        NetworkAddress(self.address)
    }
}

impl Step {
    pub fn delay(&self) -> Result<Duration> {
        match self.after.as_deref() {
            Some(text) => parse_duration(text, "steps.after"),
            None => Ok(Duration::ZERO),
        }
    }
}

fn parse_duration(text: &str, field: &str) -> Result<Duration> {
    humantime::parse_duration(text).with_context(|| format!("{field}: invalid duration {text:?}"))
}

fn parse_key(text: &str, field: &str) -> Result<[u8; KEY_LEN]> {
    let bytes = hex::decode(text.trim()).with_context(|| format!("{field}: invalid hex"))?;
    bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| anyhow::anyhow!("{field}: expected {KEY_LEN} bytes, got {}", bytes.len()))
}

fn check_channel(channel: u8, field: &str) -> Result<()> {
    if !Channel(channel).is_valid() {
        bail!("{field}: channel {channel} outside 11..=26");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdb_types::{NetworkType, PanId};

    const MINIMAL: &str = r#"
        [device]
        device_type = "EndDevice"
        ieee_address = 0x00124B0000000001

        [[steps]]
        procedure = "steer"
    "#;

    #[test]
    fn test_minimal_scenario_uses_defaults() {
        let config = ScenarioConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.display_name(), "unnamed scenario");
        assert_eq!(config.device.device_type, DeviceType::EndDevice);
        assert_eq!(config.device.endpoint(), Endpoint(1));
        assert!(config.device.cold_start);
        assert!(config.touchlink.is_none());
        assert!(config.stack.leave_confirm);
        assert_eq!(config.steps[0].procedure, Procedure::Steer);
        assert_eq!(config.steps[0].role, CommissioningRole::None);
        assert_eq!(config.steps[0].delay().unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_full_scenario_parses() {
        let config = ScenarioConfig::from_toml(
            r#"
            name = "everything"
            seed = 42

            [device]
            device_type = "Router"
            ieee_address = 0x00124B0000000001
            install_code = "83FED3407A939723A5C639B26916D505"
            out_clusters = [6, 8]

            [device.persisted_network]
            pan_id = 0x3C4D
            extended_pan_id = 0x000D6F000AAABBBB
            channel = 15
            network_address = 0x4F21
            network_type = "Distributed"

            [touchlink]
            scan_time_base = "500ms"

            [stack]
            latency = "20ms"
            join_results = ["NotPermitted", "Success"]

            [stack.trust_center]
            address = 0x00124B00000000C0
            stack_revision = 20

            [[stack.energies]]
            channel = 20
            energy = 10

            [[stack.responders]]
            address = 0x1001
            ieee = 0x0017880100001001
            endpoint = 11
            in_clusters = [3, 6]

            [[stack.targets]]
            ieee = 0x0017880100000AAA
            channel = 26
            accept = false

            [[steps]]
            procedure = "find-bind"
            role = "Initiator"
            after = "2s"

            [[steps]]
            procedure = "factory-reset"
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, 42);
        assert!(config.device.install_code().unwrap().is_some());
        assert_eq!(
            config.device.persisted_network.map(|n| (n.pan_id, n.network_type)),
            Some((PanId(0x3C4D), NetworkType::Distributed))
        );
        let touchlink = config.touchlink.as_ref().unwrap();
        assert_eq!(touchlink.channel(), Channel(11));
        assert_eq!(touchlink.lqi_threshold, 0xA0);
        assert_eq!(
            touchlink.scan_time_base().unwrap(),
            Some(Duration::from_millis(500))
        );
        assert_eq!(config.stack.latency().unwrap(), Some(Duration::from_millis(20)));
        assert_eq!(
            config.stack.join_results,
            vec![StackStatus::NotPermitted, StackStatus::Success]
        );
        let tc = config.stack.trust_center.as_ref().unwrap();
        assert_eq!(tc.key().unwrap(), None);
        assert_eq!(tc.stack_revision, 20);
        assert_eq!(config.stack.responders[0].identify_time, 180);
        assert!(!config.stack.targets[0].accept);
        assert_eq!(config.stack.targets[0].lqi, 0xD0);
        assert_eq!(config.steps[0].procedure, Procedure::FindBind);
        assert_eq!(config.steps[0].role, CommissioningRole::Initiator);
        assert_eq!(config.steps[0].delay().unwrap(), Duration::from_secs(2));
        assert_eq!(config.steps[1].procedure, Procedure::FactoryReset);
    }

    #[test]
    fn test_scenario_without_steps_is_rejected() {
        let text = MINIMAL.replace("[[steps]]\n        procedure = \"steer\"", "");
        assert!(ScenarioConfig::from_toml(&text).is_err());
    }

    #[test]
    fn test_bad_values_are_rejected() {
        let bad_key = format!("{MINIMAL}\n[stack.trust_center]\naddress = 1\nkey = \"abcd\"\n");
        let err = ScenarioConfig::from_toml(&bad_key).unwrap_err();
        assert!(format!("{err:#}").contains("expected 16 bytes"));

        let bad_delay = MINIMAL.replace("procedure = \"steer\"", "procedure = \"steer\"\nafter = \"soon\"");
        assert!(ScenarioConfig::from_toml(&bad_delay).is_err());

        let bad_channel = format!("{MINIMAL}\n[touchlink]\nchannel = 27\n");
        assert!(ScenarioConfig::from_toml(&bad_channel).is_err());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let text = MINIMAL.replace("device_type", "colour = \"red\"\ndevice_type");
        assert!(ScenarioConfig::from_toml(&text).is_err());
    }
}
