//! Core traits for state machines and their collaborators.

use crate::{Action, Event, StackRequest};
use bdb_types::{ExtendedAddress, InstallCode, LinkKey};
use std::time::Duration;
use thiserror::Error;

/// A state machine that processes events.
///
/// All commissioning logic is implemented as state machines that are:
///
/// - **Synchronous**: No async, no `.await`
/// - **Deterministic**: Same state + event = same actions
/// - **Pure-ish**: Mutates self, but performs no I/O
///
/// # Example
///
/// ```ignore
/// impl StateMachine for CommissioningController {
///     fn handle(&mut self, event: Event) -> Vec<Action> {
///         match event {
///             Event::NetworkDiscoveryConfirm { status, networks } => {
///                 self.steering.on_discovery_confirm(&mut self.attrs, status, networks)
///             }
///             Event::TimerFired { id: TimerId::FindBind } => self.find_bind.on_timer(...),
///             // ... etc
///         }
///     }
///
///     fn set_time(&mut self, now: Duration) {
///         self.now = now;
///     }
/// }
/// ```
pub trait StateMachine {
    /// Process an event, returning actions to perform.
    ///
    /// # Guarantees
    ///
    /// - **Synchronous**: This method never blocks or awaits
    /// - **Deterministic**: Given the same state and event, always returns the same actions
    /// - **No I/O**: All I/O is performed by the runner via the returned actions
    ///
    /// # Returns
    ///
    /// A list of actions for the runner to execute. Actions may include:
    /// - Requests to the network stack
    /// - Setting or cancelling timers
    /// - Enqueueing internal events
    /// - Callbacks to the application
    fn handle(&mut self, event: Event) -> Vec<Action>;

    /// Set the current time.
    ///
    /// Called by the runner before each `handle()` call.
    fn set_time(&mut self, now: Duration);

    /// Get the current time.
    ///
    /// Returns the time that was last set via `set_time()`.
    fn now(&self) -> Duration;
}

/// A confirm or indication the stack will deliver after `delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct StackReply {
    pub delay: Duration,
    pub event: Event,
}

impl StackReply {
    pub fn new(delay: Duration, event: Event) -> Self {
        Self { delay, event }
    }

    /// A reply delivered without simulated latency.
    pub fn immediate(event: Event) -> Self {
        Self::new(Duration::ZERO, event)
    }
}

/// The external NWK/APS/ZDO stack.
///
/// The runner passes every [`StackRequest`] returned by the controller to
/// the stack. Requests that complete asynchronously yield their confirms
/// as [`StackReply`] values; fire-and-forget requests yield nothing.
pub trait NetworkStack {
    fn submit(&mut self, now: Duration, request: &StackRequest) -> Vec<StackReply>;
}

/// Errors from non-volatile key storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyStoreError {
    /// Nothing stored under the requested slot.
    #[error("Key not found")]
    NotFound,

    /// No room for another device key.
    #[error("Key table full")]
    Full,

    /// Storage backend failed.
    #[error("Key storage error: {0}")]
    Storage(String),
}

/// Non-volatile key storage.
///
/// Shared with the controller as `Arc<dyn KeyStore>`; reads and writes are
/// synchronous.
pub trait KeyStore: Send + Sync {
    /// Load the factory-programmed install code.
    ///
    /// Returns [`KeyStoreError::NotFound`] when none was programmed.
    fn load_install_code(&self) -> Result<InstallCode, KeyStoreError>;

    /// Look up the link key stored for a device.
    fn find_device_key(&self, device: ExtendedAddress) -> Option<LinkKey>;

    /// Store a link key for a device, replacing any previous one.
    fn add_device_key(&self, device: ExtendedAddress, key: LinkKey) -> Result<(), KeyStoreError>;
}
