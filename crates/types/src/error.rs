//! Error types for attribute access and reporting configuration.

use crate::{ClusterId, Endpoint};
use thiserror::Error;

/// Errors reading or writing BDB attributes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    /// Identifier outside the BDB attribute range.
    #[error("Unsupported BDB attribute 0x{0:02x}")]
    Unsupported(u8),

    /// Value length does not match the attribute.
    #[error("Attribute 0x{id:02x} expects {expected} bytes, got {actual}")]
    InvalidLength {
        id: u8,
        expected: usize,
        actual: usize,
    },

    /// Value does not decode to a legal setting.
    #[error("Invalid value for attribute 0x{0:02x}")]
    InvalidValue(u8),
}

/// Errors adding a default reporting entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportingError {
    /// An entry for this endpoint, cluster and attribute already exists.
    #[error("Reporting already configured for {cluster} attr 0x{attribute_id:04x} on {endpoint}")]
    DuplicateExists {
        endpoint: Endpoint,
        cluster: ClusterId,
        attribute_id: u16,
    },

    /// The local endpoint does not implement the cluster.
    #[error("Unsupported attribute: {cluster} not on {endpoint}")]
    UnsupportedAttribute {
        endpoint: Endpoint,
        cluster: ClusterId,
    },

    /// Minimum interval exceeds a non-zero maximum interval.
    #[error("Invalid reporting interval: min {min}s > max {max}s")]
    InvalidInterval { min: u16, max: u16 },
}
