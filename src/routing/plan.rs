use super::{Cost, StopId};
use serde::Serialize;

/// Scheduled visit of one stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Visit {
    pub stop: StopId,
    pub arrival: f64,
    pub departure: f64,
    /// False when the arrival is past the stop's latest acceptable time.
    pub on_time: bool,
}

/// Visiting order computed for one request.
///
/// The first visit is always the depot. For round trips the last visit is the depot again.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePlan {
    visits: Vec<Visit>,
    total_cost: Cost,
    feasible: bool,
    round_trip: bool,
}

impl RoutePlan {
    pub(crate) fn new(visits: Vec<Visit>, total_cost: Cost, round_trip: bool) -> Self {
        let feasible = visits.iter().all(|visit| visit.on_time);
        Self {
            visits,
            total_cost,
            feasible,
            round_trip,
        }
    }

    /// Stop identifiers in visiting order.
    pub fn stop_ids(&self) -> Vec<&str> {
        self.visits.iter().map(|visit| visit.stop.as_str()).collect()
    }

    pub fn visits(&self) -> &[Visit] {
        &self.visits
    }

    pub fn total_cost(&self) -> Cost {
        self.total_cost
    }

    /// Whether every time window was met.
    pub fn is_feasible(&self) -> bool {
        self.feasible
    }

    pub fn is_round_trip(&self) -> bool {
        self.round_trip
    }

    /// Human readable ordering, e.g. `Restaurant -> Shelter B -> Shelter A`.
    pub fn describe(&self) -> String {
        self.stop_ids().join(" -> ")
    }
}
