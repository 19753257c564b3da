//! Error types for route planning.

use super::{CostError, StopId};
use thiserror::Error;

/// Structurally invalid routing input.
///
/// Unmet time windows are *not* errors; they yield a plan flagged as infeasible.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlanningError {
    /// The request did not contain a single stop.
    #[error("Route request has no stops")]
    NoStops,

    /// The start index does not point at a stop.
    #[error("Start index {index} is out of range for {len} stops")]
    InvalidStart { index: usize, len: usize },

    /// Two stops share an identifier.
    #[error("Duplicate stop identifier: {0}")]
    DuplicateStop(StopId),

    /// A time window is reversed or not a finite range.
    #[error("Invalid time window for stop {0}")]
    InvalidWindow(StopId),

    /// A service duration is negative or not finite.
    #[error("Invalid service time for stop {0}")]
    InvalidService(StopId),

    /// The cost model refused an arc.
    #[error("Cost from {from} to {to} failed: {source}")]
    Cost {
        from: StopId,
        to: StopId,
        source: CostError,
    },

    /// The cost model produced a negative or non-finite value.
    #[error("Cost from {from} to {to} is not a finite non-negative number: {value}")]
    InvalidCost { from: StopId, to: StopId, value: f64 },
}
