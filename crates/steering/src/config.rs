//! Configuration for network steering.

use bdb_types::{
    BDBC_MAX_SAME_NETWORK_RETRY_ATTEMPTS, BDBC_MIN_COMMISSIONING_TIME,
    BDBC_REC_SAME_NETWORK_RETRY_ATTEMPTS,
};
use std::time::Duration;

/// Configuration for network steering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SteeringConfig {
    /// Join attempts on the same network before giving up.
    ///
    /// Clamped to `1..=BDBC_MAX_SAME_NETWORK_RETRY_ATTEMPTS`.
    pub same_network_retry_attempts: u8,

    /// How long the network is opened for joiners after steering.
    pub permit_join_duration: Duration,

    /// Wait between a successful join and the next steering step.
    pub join_settle_delay: Duration,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            same_network_retry_attempts: BDBC_REC_SAME_NETWORK_RETRY_ATTEMPTS,
            permit_join_duration: BDBC_MIN_COMMISSIONING_TIME,
            join_settle_delay: Duration::from_millis(200),
        }
    }
}

impl SteeringConfig {
    /// Create a config with a custom retry bound.
    pub fn with_retry_attempts(same_network_retry_attempts: u8) -> Self {
        Self {
            same_network_retry_attempts,
            ..Default::default()
        }
    }

    /// Effective retry bound.
    pub fn retry_limit(&self) -> u8 {
        self.same_network_retry_attempts
            .clamp(1, BDBC_MAX_SAME_NETWORK_RETRY_ATTEMPTS)
    }
}
