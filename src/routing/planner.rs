use super::{ArcCost, Cost, GeoCost, PlanningError, RoutePlan, RouteRequest, Stop, Visit};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

const EPSILON: f64 = 1e-9;

/// Tunables of the route planner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Return to the depot after the last stop, counting the return arc in the total cost.
    pub round_trip: bool,
    /// Upper bound on 2-opt improvement passes. Zero keeps the constructed route as is.
    pub max_improvement_passes: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            round_trip: false,
            max_improvement_passes: 50,
        }
    }
}

/// Anything able to turn a [`RouteRequest`] into a [`RoutePlan`].
pub trait Planner: Send + Sync {
    fn plan(&self, request: &RouteRequest) -> Result<RoutePlan, PlanningError>;
}

/// Cheapest-arc construction followed by bounded 2-opt improvement.
#[derive(Clone)]
pub struct RoutePlanner {
    config: PlannerConfig,
    cost: Arc<dyn ArcCost>,
}

impl fmt::Debug for RoutePlanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutePlanner").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Default for RoutePlanner {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}

impl RoutePlanner {
    /// Planner over great-circle distances, falling back to unit cost for stops without
    /// coordinates.
    pub fn new(config: PlannerConfig) -> Self {
        Self::with_cost(config, GeoCost)
    }

    pub fn with_cost(config: PlannerConfig, cost: impl ArcCost + 'static) -> Self {
        Self {
            config,
            cost: Arc::new(cost),
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Orders `stops` for a single vehicle leaving from `stops[start_index]`.
    ///
    /// # Errors
    /// Returns [`PlanningError`] for structurally invalid input only. Unmet time windows yield a
    /// plan with [`RoutePlan::is_feasible`] set to false.
    pub fn plan_stops(
        &self,
        stops: &[Stop],
        start_index: usize,
    ) -> Result<RoutePlan, PlanningError> {
        validate(stops, start_index)?;
        let matrix = CostMatrix::build(stops, self.cost.as_ref())?;
        let schedule = Schedule {
            stops,
            matrix: &matrix,
            round_trip: self.config.round_trip,
        };

        let constructed = schedule.construct(start_index);
        let initial = schedule.score(&constructed);
        let (order, passes) = schedule.improve(constructed, self.config.max_improvement_passes);
        let (score, visits) = schedule.visits(&order);
        debug!(
            initial_cost = initial.cost,
            initial_late = initial.violations,
            passes,
            "Route improved"
        );
        info!(
            stops = stops.len(),
            cost = score.cost,
            late = score.violations,
            round_trip = self.config.round_trip,
            "Route planned"
        );

        Ok(RoutePlan::new(visits, score.cost, self.config.round_trip))
    }
}

impl Planner for RoutePlanner {
    fn plan(&self, request: &RouteRequest) -> Result<RoutePlan, PlanningError> {
        self.plan_stops(&request.stops, request.start_index)
    }
}

fn validate(stops: &[Stop], start_index: usize) -> Result<(), PlanningError> {
    if stops.is_empty() {
        return Err(PlanningError::NoStops);
    }
    if start_index >= stops.len() {
        return Err(PlanningError::InvalidStart {
            index: start_index,
            len: stops.len(),
        });
    }
    let mut seen = HashSet::with_capacity(stops.len());
    for stop in stops {
        if !seen.insert(stop.id.as_str()) {
            return Err(PlanningError::DuplicateStop(stop.id.clone()));
        }
        if stop.window.is_some_and(|window| !window.is_valid()) {
            return Err(PlanningError::InvalidWindow(stop.id.clone()));
        }
        if !stop.service.is_finite() || stop.service < 0.0 {
            return Err(PlanningError::InvalidService(stop.id.clone()));
        }
    }
    Ok(())
}

/// Arc costs between every ordered pair of stops, evaluated once per request.
struct CostMatrix {
    size: usize,
    values: Vec<Cost>,
}

impl CostMatrix {
    fn build(stops: &[Stop], model: &dyn ArcCost) -> Result<Self, PlanningError> {
        let size = stops.len();
        let mut values = vec![0.0; size * size];
        for (i, from) in stops.iter().enumerate() {
            for (j, to) in stops.iter().enumerate() {
                if i == j {
                    continue;
                }
                let value = model.cost(from, to).map_err(|source| PlanningError::Cost {
                    from: from.id.clone(),
                    to: to.id.clone(),
                    source,
                })?;
                if !value.is_finite() || value < 0.0 {
                    return Err(PlanningError::InvalidCost {
                        from: from.id.clone(),
                        to: to.id.clone(),
                        value,
                    });
                }
                values[i * size + j] = value;
            }
        }
        Ok(Self { size, values })
    }

    fn get(&self, from: usize, to: usize) -> Cost {
        self.values[from * self.size + to]
    }
}

#[derive(Debug, Clone, Copy)]
struct Score {
    cost: Cost,
    violations: usize,
}

impl Score {
    /// Fewer missed windows first, then strictly lower cost.
    fn improves_on(&self, other: &Score) -> bool {
        self.violations < other.violations
            || (self.violations == other.violations && self.cost < other.cost - EPSILON)
    }
}

struct Schedule<'a> {
    stops: &'a [Stop],
    matrix: &'a CostMatrix,
    round_trip: bool,
}

impl Schedule<'_> {
    fn depot_start(&self, depot: usize) -> f64 {
        self.stops[depot].window.map_or(0.0, |window| window.earliest)
    }

    /// Service start at `stop` when arriving at `arrival`, and whether the arrival is on time.
    fn arrive(&self, stop: usize, arrival: f64) -> (f64, bool) {
        match self.stops[stop].window {
            Some(window) => (arrival.max(window.earliest), arrival <= window.latest + EPSILON),
            None => (arrival, true),
        }
    }

    /// Cheapest-arc extension from the depot. Stops that can still be reached in time win over
    /// late ones; ties keep the request order.
    fn construct(&self, depot: usize) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.stops.len());
        order.push(depot);
        let mut remaining: Vec<usize> = (0..self.stops.len()).filter(|&i| i != depot).collect();
        let mut time = self.depot_start(depot) + self.stops[depot].service;
        let mut current = depot;

        while !remaining.is_empty() {
            let mut best: Option<(usize, bool, Cost)> = None;
            for (position, &candidate) in remaining.iter().enumerate() {
                let cost = self.matrix.get(current, candidate);
                let late = !self.arrive(candidate, time + cost).1;
                let better = match best {
                    None => true,
                    Some((_, best_late, best_cost)) => {
                        (best_late && !late) || (late == best_late && cost < best_cost - EPSILON)
                    }
                };
                if better {
                    best = Some((position, late, cost));
                }
            }
            let Some((position, _, cost)) = best else { break };
            let next = remaining.remove(position);
            let (start, _) = self.arrive(next, time + cost);
            time = start + self.stops[next].service;
            current = next;
            order.push(next);
        }
        order
    }

    /// 2-opt over the stops after the depot. Returns the order and the number of passes used.
    fn improve(&self, mut order: Vec<usize>, max_passes: usize) -> (Vec<usize>, usize) {
        let len = order.len();
        if len < 3 {
            return (order, 0);
        }
        let mut best = self.score(&order);
        let mut passes = 0;
        while passes < max_passes {
            passes += 1;
            let mut improved = false;
            for i in 1..len - 1 {
                for j in (i + 1)..len {
                    order[i..=j].reverse();
                    let candidate = self.score(&order);
                    if candidate.improves_on(&best) {
                        best = candidate;
                        improved = true;
                    } else {
                        order[i..=j].reverse();
                    }
                }
            }
            if !improved {
                break;
            }
        }
        (order, passes)
    }

    fn score(&self, order: &[usize]) -> Score {
        self.walk(order, |_, _, _, _| {})
    }

    fn visits(&self, order: &[usize]) -> (Score, Vec<Visit>) {
        let mut visits = Vec::with_capacity(order.len() + 1);
        let score = self.walk(order, |stop, arrival, departure, on_time| {
            visits.push(Visit {
                stop: self.stops[stop].id.clone(),
                arrival,
                departure,
                on_time,
            });
        });
        (score, visits)
    }

    /// Drives the vehicle along `order`, reporting every visit to `on_visit`.
    fn walk(&self, order: &[usize], mut on_visit: impl FnMut(usize, f64, f64, bool)) -> Score {
        let depot = order[0];
        let start = self.depot_start(depot);
        let mut time = start + self.stops[depot].service;
        on_visit(depot, start, time, true);

        let mut score = Score { cost: 0.0, violations: 0 };
        let mut previous = depot;
        for &next in &order[1..] {
            let arc = self.matrix.get(previous, next);
            score.cost += arc;
            let arrival = time + arc;
            let (service_start, on_time) = self.arrive(next, arrival);
            if !on_time {
                score.violations += 1;
            }
            time = service_start + self.stops[next].service;
            on_visit(next, arrival, time, on_time);
            previous = next;
        }

        if self.round_trip && order.len() > 1 {
            let arc = self.matrix.get(previous, depot);
            score.cost += arc;
            let arrival = time + arc;
            let (_, on_time) = self.arrive(depot, arrival);
            if !on_time {
                score.violations += 1;
            }
            on_visit(depot, arrival, arrival, on_time);
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{CostError, MatrixCost, UnitCost};

    /// Stops on a number line; arc cost is the absolute distance.
    fn line(positions: &[(&str, f64)]) -> (Vec<Stop>, MatrixCost) {
        let stops = positions
            .iter()
            .enumerate()
            .map(|(index, (id, _))| Stop::new(*id).with_index(index))
            .collect();
        let rows = positions
            .iter()
            .map(|(_, a)| positions.iter().map(|(_, b)| (a - b).abs()).collect())
            .collect();
        (stops, MatrixCost::new(rows).unwrap())
    }

    fn shelters() -> Vec<Stop> {
        vec![Stop::new("Restaurant"), Stop::new("Shelter A"), Stop::new("Shelter B")]
    }

    #[test]
    fn test_single_stop_is_trivial() {
        let planner = RoutePlanner::default();
        let plan = planner.plan_stops(&[Stop::new("Restaurant")], 0).unwrap();
        assert_eq!(plan.stop_ids(), vec!["Restaurant"]);
        assert_eq!(plan.total_cost(), 0.0);
        assert!(plan.is_feasible());

        let round_trip = RoutePlanner::with_cost(
            PlannerConfig { round_trip: true, ..Default::default() },
            UnitCost,
        );
        assert_eq!(round_trip.plan_stops(&[Stop::new("Restaurant")], 0).unwrap().total_cost(), 0.0);
    }

    #[test]
    fn test_unit_cost_keeps_request_order() {
        let planner = RoutePlanner::with_cost(PlannerConfig::default(), UnitCost);
        let plan = planner.plan_stops(&shelters(), 0).unwrap();
        assert_eq!(plan.stop_ids(), vec!["Restaurant", "Shelter A", "Shelter B"]);
        assert_eq!(plan.total_cost(), 2.0);
        assert_eq!(plan.describe(), "Restaurant -> Shelter A -> Shelter B");
    }

    #[test]
    fn test_round_trip_returns_to_depot() {
        let config = PlannerConfig { round_trip: true, ..Default::default() };
        let planner = RoutePlanner::with_cost(config, UnitCost);
        let plan = planner.plan_stops(&shelters(), 0).unwrap();
        assert_eq!(plan.stop_ids(), vec!["Restaurant", "Shelter A", "Shelter B", "Restaurant"]);
        assert_eq!(plan.total_cost(), 3.0);
        assert!(plan.is_round_trip());
    }

    #[test]
    fn test_cheapest_arc_goes_to_nearest_first() {
        let (stops, matrix) = line(&[("D", 0.0), ("Far", 5.0), ("Near", 1.0)]);
        let planner = RoutePlanner::with_cost(PlannerConfig::default(), matrix);
        let plan = planner.plan_stops(&stops, 0).unwrap();
        assert_eq!(plan.stop_ids(), vec!["D", "Near", "Far"]);
        assert_eq!(plan.total_cost(), 5.0);
    }

    #[test]
    fn test_two_opt_escapes_greedy_trap() {
        let (stops, matrix) = line(&[("D", 0.0), ("A", 1.0), ("B", -2.0), ("C", 4.0)]);

        let greedy_only = RoutePlanner::with_cost(
            PlannerConfig { max_improvement_passes: 0, ..Default::default() },
            matrix.clone(),
        );
        let greedy = greedy_only.plan_stops(&stops, 0).unwrap();
        assert_eq!(greedy.stop_ids(), vec!["D", "A", "B", "C"]);
        assert_eq!(greedy.total_cost(), 10.0);

        let planner = RoutePlanner::with_cost(PlannerConfig::default(), matrix);
        let improved = planner.plan_stops(&stops, 0).unwrap();
        assert_eq!(improved.stop_ids(), vec!["D", "B", "A", "C"]);
        assert_eq!(improved.total_cost(), 8.0);
    }

    #[test]
    fn test_time_window_reorders_route() {
        let (mut stops, matrix) = line(&[("D", 0.0), ("A", -1.0), ("B", 2.0)]);
        stops[2] = stops[2].clone().with_window(0.0, 2.5);

        let greedy_only = RoutePlanner::with_cost(
            PlannerConfig { max_improvement_passes: 0, ..Default::default() },
            matrix.clone(),
        );
        let greedy = greedy_only.plan_stops(&stops, 0).unwrap();
        assert_eq!(greedy.stop_ids(), vec!["D", "A", "B"]);
        assert!(!greedy.is_feasible());

        let planner = RoutePlanner::with_cost(PlannerConfig::default(), matrix);
        let plan = planner.plan_stops(&stops, 0).unwrap();
        assert_eq!(plan.stop_ids(), vec!["D", "B", "A"]);
        assert!(plan.is_feasible());
        assert_eq!(plan.total_cost(), 5.0);
    }

    #[test]
    fn test_unreachable_window_is_best_effort() {
        let (mut stops, matrix) = line(&[("D", 0.0), ("A", 2.0)]);
        stops[1] = stops[1].clone().with_window(0.0, 0.5);
        let planner = RoutePlanner::with_cost(PlannerConfig::default(), matrix);
        let plan = planner.plan_stops(&stops, 0).unwrap();
        assert_eq!(plan.stop_ids(), vec!["D", "A"]);
        assert!(!plan.is_feasible());
        assert!(!plan.visits()[1].on_time);
    }

    #[test]
    fn test_early_arrival_waits_for_window() {
        let (mut stops, matrix) = line(&[("D", 0.0), ("A", 1.0), ("B", 2.0)]);
        stops[1] = stops[1].clone().with_window(5.0, 10.0).with_service(1.0);
        let planner = RoutePlanner::with_cost(PlannerConfig::default(), matrix);
        let plan = planner.plan_stops(&stops, 0).unwrap();
        let visits = plan.visits();
        assert_eq!(visits[1].arrival, 1.0);
        assert_eq!(visits[1].departure, 6.0);
        assert_eq!(visits[2].arrival, 7.0);
        assert!(plan.is_feasible());
    }

    #[test]
    fn test_start_index_selects_depot() {
        let stops = vec![Stop::new("Shelter A"), Stop::new("Restaurant"), Stop::new("Shelter B")];
        let planner = RoutePlanner::with_cost(PlannerConfig::default(), UnitCost);
        let plan = planner.plan_stops(&stops, 1).unwrap();
        assert_eq!(plan.stop_ids(), vec!["Restaurant", "Shelter A", "Shelter B"]);
    }

    #[test]
    fn test_planning_is_deterministic() {
        let stops = vec![
            Stop::new("Restaurant").with_coordinate(37.7749, -122.4194),
            Stop::new("Mission").with_coordinate(37.7599, -122.4148),
            Stop::new("Oakland").with_coordinate(37.8044, -122.2712),
            Stop::new("Daly City").with_coordinate(37.6879, -122.4702),
            Stop::new("Richmond").with_coordinate(37.9358, -122.3477),
        ];
        let planner = RoutePlanner::default();
        let first = planner.plan_stops(&stops, 0).unwrap();
        for _ in 0..5 {
            assert_eq!(planner.plan_stops(&stops, 0).unwrap(), first);
        }
        assert_eq!(first.stop_ids().len(), stops.len());
    }

    #[test]
    fn test_structural_errors() {
        let planner = RoutePlanner::default();
        assert_eq!(planner.plan_stops(&[], 0), Err(PlanningError::NoStops));
        assert_eq!(
            planner.plan_stops(&shelters(), 3),
            Err(PlanningError::InvalidStart { index: 3, len: 3 })
        );

        let duplicated = vec![Stop::new("Restaurant"), Stop::new("A"), Stop::new("A")];
        assert_eq!(
            planner.plan_stops(&duplicated, 0),
            Err(PlanningError::DuplicateStop("A".into()))
        );

        let reversed = vec![Stop::new("Restaurant"), Stop::new("A").with_window(10.0, 2.0)];
        assert_eq!(
            planner.plan_stops(&reversed, 0),
            Err(PlanningError::InvalidWindow("A".into()))
        );
    }

    #[test]
    fn test_service_time_must_be_non_negative() {
        let planner = RoutePlanner::with_cost(PlannerConfig::default(), UnitCost);

        let backwards = vec![
            Stop::new("D").with_service(-100.0),
            Stop::new("A").with_window(0.0, 0.5),
        ];
        assert_eq!(
            planner.plan_stops(&backwards, 0),
            Err(PlanningError::InvalidService("D".into()))
        );

        let unbounded = vec![Stop::new("D"), Stop::new("A").with_service(f64::NAN)];
        assert_eq!(
            planner.plan_stops(&unbounded, 0),
            Err(PlanningError::InvalidService("A".into()))
        );
    }

    #[test]
    fn test_late_return_to_depot_is_a_violation() {
        let config = PlannerConfig { round_trip: true, ..Default::default() };
        let planner = RoutePlanner::with_cost(config, UnitCost);
        let stops = vec![Stop::new("D").with_window(0.0, 1.5), Stop::new("A"), Stop::new("B")];

        let plan = planner.plan_stops(&stops, 0).unwrap();
        assert_eq!(plan.stop_ids(), vec!["D", "A", "B", "D"]);
        assert_eq!(plan.total_cost(), 3.0);
        assert!(!plan.is_feasible());

        let back = plan.visits().last().unwrap();
        assert_eq!(back.arrival, 3.0);
        assert!(!back.on_time);
    }

    #[test]
    fn test_failing_cost_model_is_a_planning_error() {
        let refusing = |from: &Stop, to: &Stop| -> Result<Cost, CostError> {
            Err(CostError::Unavailable { from: from.id.clone(), to: to.id.clone() })
        };
        let planner = RoutePlanner::with_cost(PlannerConfig::default(), refusing);
        let err = planner.plan_stops(&shelters(), 0).unwrap_err();
        assert!(matches!(err, PlanningError::Cost { .. }));

        let negative = |_: &Stop, _: &Stop| -> Result<Cost, CostError> { Ok(-1.0) };
        let planner = RoutePlanner::with_cost(PlannerConfig::default(), negative);
        let err = planner.plan_stops(&shelters(), 0).unwrap_err();
        assert!(matches!(err, PlanningError::InvalidCost { value, .. } if value == -1.0));
    }
}
