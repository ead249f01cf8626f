//! BDB commissioning attributes.

use crate::{
    AttributeError, ChannelMask, CommissioningMode, CommissioningStatus, ExtendedAddress, GroupId,
    KeyExchangeMethod, LinkKey, LinkKeyType, NodeCapability, KEY_LEN,
};

/// Identifier of a BDB attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum AttributeId {
    PrimaryChannelSet = 0x60,
    SecondaryChannelSet = 0x61,
    CommissioningGroupId = 0x62,
    CommissioningMode = 0x63,
    CommissioningStatus = 0x64,
    JoiningNodeEui64 = 0x65,
    JoiningNodeNewTcLinkKey = 0x66,
    NodeCommissioningCapability = 0x67,
    JoinUsesInstallCodeKey = 0x68,
    NodeIsOnANetwork = 0x69,
    NodeJoinLinkKeyType = 0x6A,
    TcRequireKeyExchange = 0x6B,
    ScanDuration = 0x6C,
    TcLinkKeyExchangeAttempts = 0x6D,
    TcLinkKeyExchangeAttemptsMax = 0x6E,
    TcLinkKeyExchangeMethod = 0x6F,
    TcNodeJoinTimeout = 0x70,
}

impl AttributeId {
    /// Every attribute, in identifier order.
    pub const ALL: [AttributeId; 17] = [
        AttributeId::PrimaryChannelSet,
        AttributeId::SecondaryChannelSet,
        AttributeId::CommissioningGroupId,
        AttributeId::CommissioningMode,
        AttributeId::CommissioningStatus,
        AttributeId::JoiningNodeEui64,
        AttributeId::JoiningNodeNewTcLinkKey,
        AttributeId::NodeCommissioningCapability,
        AttributeId::JoinUsesInstallCodeKey,
        AttributeId::NodeIsOnANetwork,
        AttributeId::NodeJoinLinkKeyType,
        AttributeId::TcRequireKeyExchange,
        AttributeId::ScanDuration,
        AttributeId::TcLinkKeyExchangeAttempts,
        AttributeId::TcLinkKeyExchangeAttemptsMax,
        AttributeId::TcLinkKeyExchangeMethod,
        AttributeId::TcNodeJoinTimeout,
    ];

    /// Encoded length in bytes.
    pub fn encoded_len(self) -> usize {
        match self {
            AttributeId::PrimaryChannelSet | AttributeId::SecondaryChannelSet => 4,
            AttributeId::CommissioningGroupId => 2,
            AttributeId::JoiningNodeEui64 => 8,
            AttributeId::JoiningNodeNewTcLinkKey => KEY_LEN,
            _ => 1,
        }
    }
}

impl TryFrom<u8> for AttributeId {
    type Error = AttributeError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        AttributeId::ALL
            .iter()
            .copied()
            .find(|a| *a as u8 == id)
            .ok_or(AttributeError::Unsupported(id))
    }
}

/// Persistent-for-session commissioning configuration and counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommissioningAttributes {
    pub primary_channel_set: ChannelMask,
    pub secondary_channel_set: ChannelMask,
    /// Group used by finding & binding; unassigned means unicast bindings.
    pub commissioning_group_id: GroupId,
    pub commissioning_mode: CommissioningMode,
    pub commissioning_status: CommissioningStatus,
    /// EUI-64 of the node exchanging its TC link key.
    pub joining_node_eui64: ExtendedAddress,
    /// Key received during TC link-key exchange, not yet verified.
    pub joining_node_new_tc_link_key: Option<LinkKey>,
    pub node_commissioning_capability: NodeCapability,
    pub join_uses_install_code_key: bool,
    pub node_is_on_a_network: bool,
    pub node_join_link_key_type: LinkKeyType,
    pub tc_require_key_exchange: bool,
    /// Per-channel scan exponent.
    pub scan_duration: u8,
    pub tc_link_key_exchange_attempts: u8,
    pub tc_link_key_exchange_attempts_max: u8,
    pub tc_link_key_exchange_method: KeyExchangeMethod,
    /// Seconds.
    pub tc_node_join_timeout: u8,
}

impl Default for CommissioningAttributes {
    fn default() -> Self {
        Self {
            primary_channel_set: ChannelMask::TOUCHLINK_PRIMARY,
            secondary_channel_set: ChannelMask::TOUCHLINK_SECONDARY,
            commissioning_group_id: GroupId::UNASSIGNED,
            commissioning_mode: CommissioningMode::NETWORK_STEERING,
            commissioning_status: CommissioningStatus::default(),
            joining_node_eui64: ExtendedAddress::ZERO,
            joining_node_new_tc_link_key: None,
            node_commissioning_capability: NodeCapability::default(),
            join_uses_install_code_key: false,
            node_is_on_a_network: false,
            node_join_link_key_type: LinkKeyType::TrustCenter,
            tc_require_key_exchange: true,
            scan_duration: 3,
            tc_link_key_exchange_attempts: 0,
            tc_link_key_exchange_attempts_max: 3,
            tc_link_key_exchange_method: KeyExchangeMethod::Apsrk,
            tc_node_join_timeout: 0x0f,
        }
    }
}

impl CommissioningAttributes {
    /// Union of the primary and secondary channel sets.
    pub fn scan_channels(&self) -> ChannelMask {
        self.primary_channel_set.union(self.secondary_channel_set)
    }

    /// Read an attribute in its little-endian wire encoding.
    pub fn get(&self, id: AttributeId) -> Vec<u8> {
        match id {
            AttributeId::PrimaryChannelSet => self.primary_channel_set.0.to_le_bytes().to_vec(),
            AttributeId::SecondaryChannelSet => {
                self.secondary_channel_set.0.to_le_bytes().to_vec()
            }
            AttributeId::CommissioningGroupId => {
                self.commissioning_group_id.0.to_le_bytes().to_vec()
            }
            AttributeId::CommissioningMode => vec![self.commissioning_mode.bits()],
            AttributeId::CommissioningStatus => vec![self.commissioning_status.code()],
            AttributeId::JoiningNodeEui64 => self.joining_node_eui64.to_le_bytes().to_vec(),
            AttributeId::JoiningNodeNewTcLinkKey => self
                .joining_node_new_tc_link_key
                .unwrap_or(LinkKey::ZERO)
                .0
                .to_vec(),
            AttributeId::NodeCommissioningCapability => {
                vec![self.node_commissioning_capability.bits()]
            }
            AttributeId::JoinUsesInstallCodeKey => vec![self.join_uses_install_code_key as u8],
            AttributeId::NodeIsOnANetwork => vec![self.node_is_on_a_network as u8],
            AttributeId::NodeJoinLinkKeyType => vec![self.node_join_link_key_type.code()],
            AttributeId::TcRequireKeyExchange => vec![self.tc_require_key_exchange as u8],
            AttributeId::ScanDuration => vec![self.scan_duration],
            AttributeId::TcLinkKeyExchangeAttempts => vec![self.tc_link_key_exchange_attempts],
            AttributeId::TcLinkKeyExchangeAttemptsMax => {
                vec![self.tc_link_key_exchange_attempts_max]
            }
            AttributeId::TcLinkKeyExchangeMethod => vec![self.tc_link_key_exchange_method.code()],
            AttributeId::TcNodeJoinTimeout => vec![self.tc_node_join_timeout],
        }
    }

    /// Write an attribute from its little-endian wire encoding.
    ///
    /// The value must have exactly the attribute's length and decode to a
    /// legal value; otherwise nothing changes.
    pub fn set(&mut self, id: AttributeId, value: &[u8]) -> Result<(), AttributeError> {
        if value.len() != id.encoded_len() {
            return Err(AttributeError::InvalidLength {
                id: id as u8,
                expected: id.encoded_len(),
                actual: value.len(),
            });
        }
        let invalid = || AttributeError::InvalidValue(id as u8);

        match id {
            AttributeId::PrimaryChannelSet => {
                self.primary_channel_set = ChannelMask(u32::from_le_bytes(le4(value)));
            }
            AttributeId::SecondaryChannelSet => {
                self.secondary_channel_set = ChannelMask(u32::from_le_bytes(le4(value)));
            }
            AttributeId::CommissioningGroupId => {
                self.commissioning_group_id = GroupId(u16::from_le_bytes([value[0], value[1]]));
            }
            AttributeId::CommissioningMode => {
                self.commissioning_mode =
                    CommissioningMode::from_bits(value[0]).ok_or_else(invalid)?;
            }
            AttributeId::CommissioningStatus => {
                self.commissioning_status =
                    CommissioningStatus::from_code(value[0]).ok_or_else(invalid)?;
            }
            AttributeId::JoiningNodeEui64 => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(value);
                self.joining_node_eui64 = ExtendedAddress::from_le_bytes(bytes);
            }
            AttributeId::JoiningNodeNewTcLinkKey => {
                let mut key = [0u8; KEY_LEN];
                key.copy_from_slice(value);
                let key = LinkKey(key);
                self.joining_node_new_tc_link_key = (!key.is_zero()).then_some(key);
            }
            AttributeId::NodeCommissioningCapability => {
                self.node_commissioning_capability =
                    NodeCapability::from_bits(value[0]).ok_or_else(invalid)?;
            }
            AttributeId::JoinUsesInstallCodeKey => {
                self.join_uses_install_code_key = value[0] != 0;
            }
            AttributeId::NodeIsOnANetwork => self.node_is_on_a_network = value[0] != 0,
            AttributeId::NodeJoinLinkKeyType => {
                self.node_join_link_key_type =
                    LinkKeyType::from_code(value[0]).ok_or_else(invalid)?;
            }
            AttributeId::TcRequireKeyExchange => self.tc_require_key_exchange = value[0] != 0,
            AttributeId::ScanDuration => self.scan_duration = value[0],
            AttributeId::TcLinkKeyExchangeAttempts => {
                if value[0] > self.tc_link_key_exchange_attempts_max {
                    return Err(invalid());
                }
                self.tc_link_key_exchange_attempts = value[0];
            }
            AttributeId::TcLinkKeyExchangeAttemptsMax => {
                if value[0] == 0 {
                    return Err(invalid());
                }
                self.tc_link_key_exchange_attempts_max = value[0];
                self.tc_link_key_exchange_attempts =
                    self.tc_link_key_exchange_attempts.min(value[0]);
            }
            AttributeId::TcLinkKeyExchangeMethod => {
                self.tc_link_key_exchange_method =
                    KeyExchangeMethod::from_code(value[0]).ok_or_else(invalid)?;
            }
            AttributeId::TcNodeJoinTimeout => self.tc_node_join_timeout = value[0],
        }
        Ok(())
    }
}

fn le4(value: &[u8]) -> [u8; 4] {
    [value[0], value[1], value[2], value[3]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TerminalStatus;

    #[test]
    fn test_defaults() {
        let attrs = CommissioningAttributes::default();
        assert_eq!(attrs.primary_channel_set, ChannelMask::TOUCHLINK_PRIMARY);
        assert_eq!(attrs.commissioning_group_id, GroupId::UNASSIGNED);
        assert_eq!(attrs.commissioning_mode, CommissioningMode::NETWORK_STEERING);
        assert_eq!(attrs.scan_duration, 3);
        assert_eq!(attrs.tc_link_key_exchange_attempts_max, 3);
        assert_eq!(attrs.scan_channels(), ChannelMask::ALL);
    }

    #[test]
    fn test_attribute_ids_are_contiguous() {
        for (offset, id) in AttributeId::ALL.iter().enumerate() {
            assert_eq!(*id as u8, 0x60 + offset as u8);
            assert_eq!(AttributeId::try_from(*id as u8).unwrap(), *id);
        }
        assert!(matches!(
            AttributeId::try_from(0x71),
            Err(AttributeError::Unsupported(0x71))
        ));
    }

    #[test]
    fn test_get_set_every_attribute() {
        let mut attrs = CommissioningAttributes::default();
        for id in AttributeId::ALL {
            let value = attrs.get(id);
            assert_eq!(value.len(), id.encoded_len());
            attrs.set(id, &value).unwrap();
        }
        assert_eq!(attrs, CommissioningAttributes::default());
    }

    #[test]
    fn test_set_rejects_wrong_length() {
        let mut attrs = CommissioningAttributes::default();
        let err = attrs
            .set(AttributeId::PrimaryChannelSet, &[0x00, 0x08])
            .unwrap_err();
        assert!(matches!(
            err,
            AttributeError::InvalidLength {
                expected: 4,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_set_channel_mask_little_endian() {
        let mut attrs = CommissioningAttributes::default();
        attrs
            .set(AttributeId::PrimaryChannelSet, &[0x00, 0x08, 0x00, 0x00])
            .unwrap();
        assert_eq!(attrs.primary_channel_set, ChannelMask(0x0000_0800));
    }

    #[test]
    fn test_set_rejects_illegal_values() {
        let mut attrs = CommissioningAttributes::default();
        assert!(attrs.set(AttributeId::CommissioningMode, &[0xF0]).is_err());
        assert!(attrs.set(AttributeId::CommissioningStatus, &[0x20]).is_err());
        assert!(attrs.set(AttributeId::TcLinkKeyExchangeAttempts, &[4]).is_err());
        assert_eq!(attrs, CommissioningAttributes::default());

        attrs.set(AttributeId::CommissioningStatus, &[3]).unwrap();
        assert_eq!(
            attrs.commissioning_status,
            CommissioningStatus::Finished(TerminalStatus::NoNetwork)
        );
    }

    #[test]
    fn test_lowering_max_clamps_attempts() {
        let mut attrs = CommissioningAttributes::default();
        attrs.tc_link_key_exchange_attempts = 3;
        attrs
            .set(AttributeId::TcLinkKeyExchangeAttemptsMax, &[2])
            .unwrap();
        assert_eq!(attrs.tc_link_key_exchange_attempts, 2);
    }
}
