//! Trust-center link-key exchange.
//!
//! After joining a centralized network the node replaces its provisional
//! (well-known or install-code derived) link key with a unique key issued by
//! the trust center.
//!
//! # Flow
//!
//! ```text
//! start() ── start delay ──► attempt n
//!                              │
//!            APSRK             │             CBKE
//!   Node_Desc_req(0x0000) ◄────┴────► KeyEstablishment
//!        │
//!        ├── stack revision < 21 ──► done (legacy trust center)
//!        ▼
//!   RequestTcLinkKey ──► key received ──► VerifyKey ──► InstallTcLinkKey ──► done
//!
//! attempt window expired:  n < max ──► attempt n+1
//!                          n = max ──► Leave ──► TclkExFailure
//! ```
//!
//! Success hands back to steering through `NetworkSteerPermitJoin`; failure
//! ends steering with `NetworkSteerFinished(TclkExFailure)`.

mod config;
mod state;

pub use config::TcLinkKeyConfig;
pub use state::TcLinkKeyExchange;
