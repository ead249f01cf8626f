//! Configuration for touchlink.

use bdb_types::{
    BDBC_TL_INTERPAN_TRANS_ID_LIFETIME, BDBC_TL_MIN_STARTUP_DELAY_TIME,
    BDBC_TL_RX_WINDOW_DURATION, BDBC_TL_SCAN_TIME_BASE_DURATION,
};
use std::time::Duration;

/// Configuration for touchlink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchlinkConfig {
    /// Dwell time per scan request.
    pub scan_time_base: Duration,

    /// Scan requests sent on the first primary channel.
    pub first_channel_scans: u8,

    /// Scan the secondary channels when the primary pass heard nothing.
    pub extended_scan: bool,

    /// Validity of an inter-PAN transaction id.
    pub transaction_lifetime: Duration,

    /// Wait after a network start/join response before using the network.
    pub startup_delay: Duration,

    /// Target listening window after each scan response or command.
    pub rx_window: Duration,

    /// Scan responses kept for target selection.
    pub max_scan_targets: usize,

    /// Seconds the selected target is asked to identify.
    pub identify_duration: u16,

    /// Allow touchlink while on a centralized network.
    pub allow_steal: bool,
}

impl Default for TouchlinkConfig {
    fn default() -> Self {
        Self {
            scan_time_base: BDBC_TL_SCAN_TIME_BASE_DURATION,
            first_channel_scans: 5,
            extended_scan: true,
            transaction_lifetime: BDBC_TL_INTERPAN_TRANS_ID_LIFETIME,
            startup_delay: BDBC_TL_MIN_STARTUP_DELAY_TIME,
            rx_window: BDBC_TL_RX_WINDOW_DURATION,
            max_scan_targets: 4,
            identify_duration: 3,
            allow_steal: false,
        }
    }
}

impl TouchlinkConfig {
    /// Scan the primary channels only.
    pub fn without_extended_scan() -> Self {
        Self {
            extended_scan: false,
            ..Default::default()
        }
    }

    /// Permit touchlink on a centralized network.
    pub fn with_steal_allowed(mut self) -> Self {
        self.allow_steal = true;
        self
    }
}
