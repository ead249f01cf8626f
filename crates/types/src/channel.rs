//! Channel masks.

use crate::Channel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A set of 2.4 GHz channels, one bit per channel number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelMask(pub u32);

impl ChannelMask {
    /// No channels.
    pub const EMPTY: Self = ChannelMask(0);

    /// Channels 11 through 26.
    pub const ALL: Self = ChannelMask(0x07FF_F800);

    /// Touchlink primary channels: 11, 15, 20 and 25.
    pub const TOUCHLINK_PRIMARY: Self = ChannelMask(0x0210_8800);

    /// Every 2.4 GHz channel outside the touchlink primary set.
    pub const TOUCHLINK_SECONDARY: Self = ChannelMask(0x07FF_F800 ^ 0x0210_8800);

    /// Mask containing a single channel.
    pub fn single(channel: Channel) -> Self {
        if channel.is_valid() {
            ChannelMask(1 << channel.0)
        } else {
            Self::EMPTY
        }
    }

    pub fn is_empty(self) -> bool {
        self.0 & Self::ALL.0 == 0
    }

    pub fn contains(self, channel: Channel) -> bool {
        channel.is_valid() && self.0 & (1 << channel.0) != 0
    }

    pub fn union(self, other: Self) -> Self {
        ChannelMask(self.0 | other.0)
    }

    /// Number of valid channels in the mask.
    pub fn len(self) -> usize {
        (self.0 & Self::ALL.0).count_ones() as usize
    }

    /// Lowest channel in the mask.
    pub fn first(self) -> Option<Channel> {
        self.channels().next()
    }

    /// Iterate channels in ascending order.
    pub fn channels(self) -> impl Iterator<Item = Channel> {
        (Channel::MIN.0..=Channel::MAX.0)
            .map(Channel)
            .filter(move |c| self.contains(*c))
    }
}

impl fmt::Display for ChannelMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}
