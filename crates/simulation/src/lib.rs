//! Deterministic simulation runner.
//!
//! This crate drives a [`CommissioningController`](bdb_controller::CommissioningController)
//! against a scripted network stack in virtual time. Given the same script
//! and seed, it produces identical results every run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulationRunner                       │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Event Queue (BTreeMap<EventKey, Event>)        │ │
//! │  │     Ordered by: time, priority, sequence           │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     CommissioningController                        │ │
//! │  │     Processes events sequentially                  │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Actions → timers, ScriptedStack replies,       │ │
//! │  │     internal events, recorded notifications        │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod error;
mod event_queue;
mod runner;
mod stack;
mod storage;

pub use error::SimulationError;
pub use event_queue::{EventKey, EventPriority};
pub use runner::{SimulationRunner, SimulationStats};
pub use stack::{Responder, ScriptedStack, ScriptedTarget, TrustCenterScript};
pub use storage::MemoryKeyStore;
