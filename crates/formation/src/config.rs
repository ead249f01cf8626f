//! Configuration for network formation.

use bdb_types::BDBC_MIN_COMMISSIONING_TIME;
use std::time::Duration;

/// Configuration for network formation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormationConfig {
    /// Run an energy scan over the primary channels and form on the quietest.
    pub energy_scan: bool,

    /// How long the new network is opened for joiners.
    pub permit_join_duration: Duration,
}

impl Default for FormationConfig {
    fn default() -> Self {
        Self {
            energy_scan: true,
            permit_join_duration: BDBC_MIN_COMMISSIONING_TIME,
        }
    }
}

impl FormationConfig {
    /// Form on the configured channel sets without scanning energy first.
    pub fn without_energy_scan() -> Self {
        Self {
            energy_scan: false,
            ..Default::default()
        }
    }
}
