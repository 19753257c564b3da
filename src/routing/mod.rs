//! Single-vehicle route planning.
//!
//! A [`RouteRequest`] lists the depot (the donor restaurant) and the recipient shelters. The
//! [`RoutePlanner`] orders them for one vehicle:
//!
//! 1. **Construction**: starting at the depot, repeatedly extend the route with the unvisited
//!    stop reachable at the lowest arc cost (cheapest-arc extension), preferring stops whose
//!    time window can still be met.
//! 2. **Improvement**: 2-opt segment reversals within a bounded number of passes.
//!
//! Costs come from an [`ArcCost`] model supplied by the caller, so switching from unit costs to
//! real distances never changes the search itself. Missed time windows are reported through
//! [`RoutePlan::is_feasible`] instead of failing the request.

pub mod cost;
pub mod error;
pub mod plan;
pub mod planner;
pub mod stop;

pub use cost::*;
pub use error::*;
pub use plan::*;
pub use planner::*;
pub use stop::*;
