//! Configuration for finding & binding.

use bdb_types::BDBC_MIN_COMMISSIONING_TIME;
use std::time::Duration;

/// Configuration for finding & binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindBindConfig {
    /// How long identify query responses are collected.
    pub identify_query_window: Duration,

    /// Wait for a simple-descriptor or IEEE-address response.
    pub response_timeout: Duration,

    /// Seconds a target identifies for.
    pub identify_time: u16,

    /// Identify countdown resolution.
    pub identify_tick: Duration,
}

impl Default for FindBindConfig {
    fn default() -> Self {
        Self {
            identify_query_window: Duration::from_secs(5),
            response_timeout: Duration::from_secs(5),
            identify_time: BDBC_MIN_COMMISSIONING_TIME.as_secs() as u16,
            identify_tick: Duration::from_secs(1),
        }
    }
}

impl FindBindConfig {
    /// Create a config with a custom target identify time.
    pub fn with_identify_time(identify_time: u16) -> Self {
        Self {
            identify_time,
            ..Default::default()
        }
    }
}
