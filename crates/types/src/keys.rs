//! Link keys, key configuration and install-code key derivation.

use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes128;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of every link and network key.
pub const KEY_LEN: usize = 16;

/// A 128-bit APS link key or NWK network key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkKey(pub [u8; KEY_LEN]);

impl LinkKey {
    pub const ZERO: Self = LinkKey([0; KEY_LEN]);

    /// "ZigBeeAlliance09", the default global trust-center link key.
    pub const DEFAULT_TC: Self = LinkKey(*b"ZigBeeAlliance09");

    /// Default global link key for distributed-security networks.
    pub const DISTRIBUTED_DEFAULT: Self = LinkKey([
        0xD0, 0xD1, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xDB, 0xDC, 0xDD, 0xDE,
        0xDF,
    ]);

    /// Touchlink certification key.
    pub const TOUCHLINK_CERTIFICATION: Self = LinkKey([
        0xC0, 0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xCB, 0xCC, 0xCD, 0xCE,
        0xCF,
    ]);

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; KEY_LEN]
    }
}

impl fmt::Debug for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinkKey({})", hex::encode(self.0))
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Kind of link key the node used when joining (`nodeJoinLinkKeyType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LinkKeyType {
    /// Default global trust-center link key.
    #[default]
    TrustCenter,
    /// Distributed-security global link key.
    DistributedGlobal,
    /// Install-code derived preconfigured link key.
    InstallCode,
    /// Touchlink preconfigured link key.
    Touchlink,
}

impl LinkKeyType {
    pub fn code(self) -> u8 {
        match self {
            LinkKeyType::TrustCenter => 0,
            LinkKeyType::DistributedGlobal => 1,
            LinkKeyType::InstallCode => 2,
            LinkKeyType::Touchlink => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(LinkKeyType::TrustCenter),
            1 => Some(LinkKeyType::DistributedGlobal),
            2 => Some(LinkKeyType::InstallCode),
            3 => Some(LinkKeyType::Touchlink),
            _ => None,
        }
    }

    /// Joins with these keys skip the trust-center link-key exchange.
    pub fn skips_tc_key_exchange(self) -> bool {
        matches!(self, LinkKeyType::DistributedGlobal | LinkKeyType::Touchlink)
    }
}

/// How a configured key is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyScope {
    /// Same key for every device.
    Global,
    /// Per-device key, keyed by extended address.
    Unique,
    /// Touchlink master key.
    Master,
    /// Touchlink certification key.
    Certification,
}

/// A configured key and how it is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySlot {
    pub key: LinkKey,
    pub scope: KeyScope,
}

impl KeySlot {
    pub fn new(key: LinkKey, scope: KeyScope) -> Self {
        Self { key, scope }
    }
}

/// The three preconfigured link keys supplied at init.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkKeyConfig {
    /// Trust-center link key for centralized networks.
    pub tc: KeySlot,
    /// Link key for distributed networks.
    pub distributed: KeySlot,
    /// Touchlink key.
    pub touchlink: KeySlot,
}

impl Default for LinkKeyConfig {
    fn default() -> Self {
        Self {
            tc: KeySlot::new(LinkKey::DEFAULT_TC, KeyScope::Global),
            distributed: KeySlot::new(LinkKey::DISTRIBUTED_DEFAULT, KeyScope::Global),
            touchlink: KeySlot::new(LinkKey::TOUCHLINK_CERTIFICATION, KeyScope::Certification),
        }
    }
}

/// Method for replacing the join link key after a centralized join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum KeyExchangeMethod {
    /// APS Request-Key.
    #[default]
    Apsrk,
    /// Certificate-based key establishment.
    Cbke,
}

impl KeyExchangeMethod {
    pub fn code(self) -> u8 {
        match self {
            KeyExchangeMethod::Apsrk => 0,
            KeyExchangeMethod::Cbke => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(KeyExchangeMethod::Apsrk),
            1 => Some(KeyExchangeMethod::Cbke),
            _ => None,
        }
    }
}

/// A 128-bit install code, without its CRC.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstallCode(pub [u8; KEY_LEN]);

impl InstallCode {
    /// All bytes 0xFF: the value of unprogrammed storage.
    pub fn is_erased(&self) -> bool {
        self.0 == [0xFF; KEY_LEN]
    }

    /// CRC-16/X.25 over the code bytes.
    pub fn crc16(&self) -> u16 {
        crc16_x25(&self.0)
    }

    /// Derive the preconfigured link key: AES-MMO over the code with its
    /// CRC appended low byte first.
    pub fn derive_link_key(&self) -> LinkKey {
        let crc = self.crc16();
        let mut buf = [0u8; KEY_LEN + 2];
        buf[..KEY_LEN].copy_from_slice(&self.0);
        buf[KEY_LEN..].copy_from_slice(&crc.to_le_bytes());
        LinkKey(aes_mmo_hash(&buf))
    }
}

impl fmt::Debug for InstallCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstallCode({})", hex::encode(self.0))
    }
}

fn crc16_x25(data: &[u8]) -> u16 {
    const POLY: u16 = 0x8408;

    let mut crc: u16 = 0xFFFF;
    for byte in data {
        let mut bits = *byte;
        for _ in 0..8 {
            if (crc ^ u16::from(bits)) & 0x0001 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
            bits >>= 1;
        }
    }
    !crc
}

/// Matyas-Meyer-Oseas hash over AES-128.
///
/// Input longer than 8191 bytes is outside the short-message padding and
/// never occurs for install codes.
fn aes_mmo_hash(data: &[u8]) -> [u8; KEY_LEN] {
    let bit_len = (data.len() * 8) as u16;

    let mut padded = data.to_vec();
    padded.push(0x80);
    while padded.len() % KEY_LEN != KEY_LEN - 2 {
        padded.push(0x00);
    }
    padded.extend_from_slice(&bit_len.to_be_bytes());

    let mut hash = [0u8; KEY_LEN];
    for block in padded.chunks_exact(KEY_LEN) {
        let cipher = Aes128::new(GenericArray::from_slice(&hash));
        let mut out = GenericArray::clone_from_slice(block);
        cipher.encrypt_block(&mut out);
        for (h, (o, m)) in hash.iter_mut().zip(out.iter().zip(block)) {
            *h = o ^ m;
        }
    }
    hash
}
