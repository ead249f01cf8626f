//! Finding & binding.
//!
//! The target identifies so that an initiator can find it; the initiator
//! collects identifying endpoints, reads their simple descriptors, and binds
//! every matching cluster.
//!
//! # Initiator
//!
//! ```text
//! IdentifyQuery (broadcast) ── 5 s window ──► responders queued (at most 5)
//!   │                                            │ none
//!   │                                            ▼
//!   │                                  NoIdentifyQueryResponse
//!   ▼ per queued endpoint
//! FindOrBindSimpleDescReq ─► Simple_Desc_req ─► match clusters
//!   │                                              │
//!   │      group assigned: AddGroup ◄──────────────┤
//!   │      otherwise:      IEEE_addr_req ◄─────────┘
//!   ▼
//! Bind × matched clusters ─► FindBindSuccess ─► next endpoint
//!   │                                              │ queue empty
//!   └─ TABLE_FULL ─► BindingTableFull              ▼
//!                                               Success
//! ```
//!
//! # Target
//!
//! Identifies for `identify_time` seconds, ticking once per second and
//! answering identify queries with the remaining time.

mod config;
mod state;

pub use config::FindBindConfig;
pub use state::FindingBinding;
