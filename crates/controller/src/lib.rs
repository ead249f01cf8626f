//! BDB commissioning controller.
//!
//! This crate composes the steering, formation, touchlink, finding & binding
//! and TC link-key exchange state machines into the single commissioning
//! lifecycle the application sees.
//!
//! # States
//!
//! ```text
//!        init()
//!          │
//!          ▼
//!        Init ──InitDone──► Idle ◄──────────────────────────────────────┐
//!                            │                                          │
//!              start_commissioning(mode, role)                          │
//!                            │                                          │
//!      ┌─────────────────────┼─────────────────────┐                    │
//!      ▼ touchlink           ▼ steer               │                    │
//! CommissioningTouchlink  CommissioningNetworkSteer │                    │
//!      │  no response, FN ──►│                      │                    │
//!      │                     ▼ finished             │                    │
//!      │           CommissioningNetworkFormation ◄──┘ (form bit, off network)
//!      │                     │ finished                                 │
//!      │                     ▼                                          │
//!      │            CommissioningFindOrBind (find bit, on network)      │
//!      │                     │ finished                                 │
//!      └─────────────────────┴──────────► confirm ──────────────────────┘
//! ```
//!
//! `CommissioningBusy` covers a factory reset waiting for its leave confirm;
//! `RejoinDone` covers reporting an unsolicited rejoin.
//!
//! # Components
//!
//! - [`CommissioningController`] - Top-level state machine
//! - [`ControllerConfig`] - Device identity and sub-procedure configs
//! - [`CommissioningContext`] - Per-boot commissioning context
//! - [`ControllerError`] - Synchronous API misuse

mod config;
mod context;
mod error;
mod lifecycle;
mod state;

pub use config::ControllerConfig;
pub use context::{BdbState, BootInfo, CommissioningContext};
pub use error::ControllerError;
pub use state::CommissioningController;
