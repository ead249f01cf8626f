//! Commissioning settings supplied at init.

use crate::{Channel, LinkKeyConfig};
use serde::{Deserialize, Serialize};

/// Settings the application hands to init.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissioningSettings {
    pub link_keys: LinkKeyConfig,
    /// Enable touchlink (initiator start and target listening).
    pub touchlink_enabled: bool,
    /// Channel a factory-new touchlink target listens on.
    pub touchlink_channel: Channel,
    /// Minimum LQI for touchlink scan requests and responses.
    pub touchlink_lqi_threshold: u8,
}

impl Default for CommissioningSettings {
    fn default() -> Self {
        Self {
            link_keys: LinkKeyConfig::default(),
            touchlink_enabled: false,
            touchlink_channel: Channel(11),
            touchlink_lqi_threshold: 0xA0,
        }
    }
}

impl CommissioningSettings {
    pub fn with_link_keys(mut self, link_keys: LinkKeyConfig) -> Self {
        self.link_keys = link_keys;
        self
    }

    pub fn with_touchlink(mut self, channel: Channel, lqi_threshold: u8) -> Self {
        self.touchlink_enabled = true;
        self.touchlink_channel = channel;
        self.touchlink_lqi_threshold = lqi_threshold;
        self
    }
}
