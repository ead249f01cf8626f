//! Network formation.
//!
//! A coordinator forms a centralized network with itself as trust center;
//! a router forms a distributed network. End devices cannot form.
//!
//! ```text
//! start()
//!   │
//!   ├── forced channel ────────────────────► FormNetwork(channel)
//!   ├── energy scan ─► EnergyScan(primary) ─► FormNetwork(quietest)
//!   └──────────────────────────────────────► FormNetwork(primary)
//!                                               │ failure
//!                                               ▼
//!                                           FormNetwork(secondary) ─► failure ─► FormationFailure
//!
//! success ─► FormationDone report ─► NetworkFormationPermitJoin
//!         ─► MgmtPermitJoin + LocalPermitJoin ─► NetworkFormationFinished(Success)
//! ```

mod config;
mod state;

pub use config::FormationConfig;
pub use state::NetworkFormation;
