//! BDB constants.

use std::time::Duration;

/// Hard ceiling on join retries against the same network.
pub const BDBC_MAX_SAME_NETWORK_RETRY_ATTEMPTS: u8 = 10;

/// Recommended join retries against the same network.
pub const BDBC_REC_SAME_NETWORK_RETRY_ATTEMPTS: u8 = 3;

/// Minimum time a network stays open (or a target identifies) after commissioning.
pub const BDBC_MIN_COMMISSIONING_TIME: Duration = Duration::from_secs(180);

/// Window for each trust-center link-key exchange attempt.
pub const BDBC_TC_LINK_KEY_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Validity of an inter-PAN transaction identifier.
pub const BDBC_TL_INTERPAN_TRANS_ID_LIFETIME: Duration = Duration::from_secs(8);

/// Delay before an initiator uses a network a touchlink target just started.
pub const BDBC_TL_MIN_STARTUP_DELAY_TIME: Duration = Duration::from_secs(2);

/// How long a touchlink target listens for follow-up commands.
pub const BDBC_TL_RX_WINDOW_DURATION: Duration = Duration::from_secs(5);

/// Touchlink scan listen time per channel.
pub const BDBC_TL_SCAN_TIME_BASE_DURATION: Duration = Duration::from_millis(250);

/// Capacity of the finding & binding discovery queue.
pub const FIND_BIND_QUEUE_SIZE: usize = 5;
