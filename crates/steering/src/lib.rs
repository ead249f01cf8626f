//! Network steering.
//!
//! Steering either joins a discovered network (factory-new node) or, for a
//! node already on a network, re-opens the network for joiners.
//!
//! # Flow
//!
//! ```text
//! start()
//!   │
//!   ├── on a network ──────────────────────────────► NetworkSteerPermitJoin
//!   │
//!   ▼
//! NetworkDiscovery(primary) ─► empty ─► NetworkDiscovery(secondary) ─► empty ─► NoNetwork
//!   │
//!   ▼ best permit-joining beacon
//! Associate / Rejoin ─► failure ─► retry same network (bounded) ─► NoNetwork
//!   │
//!   ▼ success, settle delay
//! centralized? ──yes──► NetworkSteerRetrieveTcLinkKey
//!   │no
//!   ▼
//! NetworkSteerPermitJoin ─► MgmtPermitJoin + LocalPermitJoin ─► NetworkSteerFinished
//! ```
//!
//! # Components
//!
//! - [`NetworkSteering`] - Sub-state machine
//! - [`SteeringConfig`] - Retry bound and durations

mod config;
mod state;

pub use config::SteeringConfig;
pub use state::NetworkSteering;
