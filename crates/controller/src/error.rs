//! Error types for the controller API.

use crate::BdbState;
use bdb_core::KeyStoreError;
use bdb_types::{Channel, DiscoveryQueueFull};
use thiserror::Error;

/// Errors returned synchronously by controller entry points.
///
/// Commissioning results are never errors; they arrive later as
/// [`Notification::Commissioning`](bdb_core::Notification::Commissioning).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// The controller is not idle. Nothing was changed.
    #[error("Illegal request in state {state}")]
    IllegalRequest { state: BdbState },

    /// `init` was already called.
    #[error("Controller already initialized")]
    AlreadyInitialized,

    /// `init` has not been called yet.
    #[error("Controller not initialized")]
    NotInitialized,

    /// Channel outside 11..=26.
    #[error("Invalid channel {0}")]
    InvalidChannel(Channel),

    #[error(transparent)]
    DiscoveryQueueFull(#[from] DiscoveryQueueFull),

    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),
}
