//! Configuration for the trust-center link-key exchange.

use bdb_types::BDBC_TC_LINK_KEY_EXCHANGE_TIMEOUT;
use std::time::Duration;

/// Configuration for the trust-center link-key exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcLinkKeyConfig {
    /// Delay between joining and the first attempt.
    pub start_delay: Duration,

    /// Window for one attempt to complete.
    pub attempt_timeout: Duration,

    /// How long to wait for the leave confirm after the last attempt failed.
    pub leave_timeout: Duration,

    /// Lowest trust-center stack revision that supports APS request-key.
    pub min_request_key_revision: u8,
}

impl Default for TcLinkKeyConfig {
    fn default() -> Self {
        Self {
            start_delay: Duration::from_secs(1),
            attempt_timeout: BDBC_TC_LINK_KEY_EXCHANGE_TIMEOUT,
            leave_timeout: Duration::from_secs(3),
            min_request_key_revision: 21,
        }
    }
}
