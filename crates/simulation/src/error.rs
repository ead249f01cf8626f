//! Errors from driving a simulation.

use bdb_controller::BdbState;
use std::time::Duration;
use thiserror::Error;

/// Why a run stopped short of an idle controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// Nothing left to process and the controller is still busy.
    #[error("Controller stuck in {state} at {time:?} with no events left")]
    Stalled { state: BdbState, time: Duration },

    #[error("Controller still in {state} at the {limit:?} limit ({pending} events pending)")]
    TimeLimit {
        state: BdbState,
        limit: Duration,
        pending: usize,
    },
}
