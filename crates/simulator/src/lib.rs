//! BDB commissioning simulator.
//!
//! Runs a single commissioning device against a scripted network, driven by
//! a TOML scenario file. Builds on `bdb-simulation`:
//!
//! - **Scenario files**: the device, its persisted state, the networks, trust
//!   center, identify responders and touchlink targets around it
//! - **Steps**: commissioning procedures run one after another, each until
//!   the controller is idle again
//! - **Reports**: per-step results plus every application callback
//!
//! # Example
//!
//! ```ignore
//! use bdb_simulator::{Scenario, ScenarioConfig};
//! use std::time::Duration;
//!
//! let config = ScenarioConfig::load("scenarios/steer.toml".as_ref())?;
//! let report = Scenario::new(config)?.run(Duration::from_secs(600))?;
//! println!("{report}");
//! ```

pub mod config;
pub mod scenario;

pub use config::{Procedure, ScenarioConfig, Step};
pub use scenario::{Scenario, ScenarioReport, StepOutcome};
