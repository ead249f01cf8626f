//! Touchlink commissioning.
//!
//! Proximity pairing over short-lived inter-PAN transactions. One
//! [`Touchlink`] instance plays both roles: the initiator runs when the
//! application starts touchlink, the target listens whenever touchlink is
//! enabled and the node is idle.
//!
//! # Initiator
//!
//! ```text
//! scan: 5× first primary channel, then each remaining primary channel (250 ms each)
//!         └─ nothing heard ─► secondary channels (extended scan)
//!   │
//!   ▼ select target (priority request first)
//! same network ─────────────────────────────► Success
//! centralized, no steal ────────────────────► NotPermitted
//! nobody can assign addresses ──────────────► NotAddressAssignmentCapable
//!   │
//!   ▼
//! Identify + NetworkStart/Join ─► response within transaction lifetime ─► 2 s startup delay
//!   │                                                                       │
//!   └─ no/negative response ─► TargetFailure              apply network ◄───┘ ─► Success
//! ```
//!
//! # Target
//!
//! ```text
//! scan request ─► scan response, RX window (5 s) ─► network request ─► apply network ─► start confirm ─► Success
//!                        └─ window expires ─► TargetFailure (factory new) / Success
//! ```

mod config;
mod initiator;
mod state;
mod target;

pub use config::TouchlinkConfig;
pub use state::Touchlink;
