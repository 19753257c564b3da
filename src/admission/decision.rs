use crate::routing::RoutePlan;
use serde::{Serialize, Serializer};
use std::fmt;

/// Why a donation was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    UnreadableImage,
    QualityCheckFailed,
    NoValidRoute,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::UnreadableImage => "unreadable image",
            RejectionReason::QualityCheckFailed => "quality check failed",
            RejectionReason::NoValidRoute => "no valid route",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AdmissionStatus {
    Accepted,
    Rejected,
}

/// Final answer for one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionDecision {
    Accepted { route: RoutePlan },
    Rejected { reason: RejectionReason },
}

impl AdmissionDecision {
    pub fn status(&self) -> AdmissionStatus {
        match self {
            AdmissionDecision::Accepted { .. } => AdmissionStatus::Accepted,
            AdmissionDecision::Rejected { .. } => AdmissionStatus::Rejected,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status() == AdmissionStatus::Accepted
    }

    pub fn reason(&self) -> Option<RejectionReason> {
        match self {
            AdmissionDecision::Rejected { reason } => Some(*reason),
            AdmissionDecision::Accepted { .. } => None,
        }
    }

    pub fn route(&self) -> Option<&RoutePlan> {
        match self {
            AdmissionDecision::Accepted { route } => Some(route),
            AdmissionDecision::Rejected { .. } => None,
        }
    }

    /// The decision as the JSON object returned to the submitter.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!(self)
    }
}

/// Wire shape: `status` always, `reason` only when rejected, `route` only when accepted.
#[derive(Serialize)]
struct DecisionRecord<'a> {
    status: AdmissionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    route: Option<RouteRecord<'a>>,
}

#[derive(Serialize)]
struct RouteRecord<'a> {
    stops: Vec<&'a str>,
    summary: String,
    total_cost: f64,
    feasible: bool,
}

impl Serialize for AdmissionDecision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let route = self.route().map(|plan| RouteRecord {
            stops: plan.stop_ids(),
            summary: plan.describe(),
            total_cost: plan.total_cost(),
            feasible: plan.is_feasible(),
        });
        DecisionRecord {
            status: self.status(),
            reason: self.reason().map(|reason| reason.as_str()),
            route,
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{PlannerConfig, RoutePlanner, Stop, UnitCost};
    use serde_json::json;

    #[test]
    fn test_rejected_json_has_no_route() {
        let decision = AdmissionDecision::Rejected { reason: RejectionReason::QualityCheckFailed };
        assert_eq!(
            decision.to_json(),
            json!({ "status": "Rejected", "reason": "quality check failed" })
        );
    }

    #[test]
    fn test_accepted_json_is_derived_from_plan() {
        let planner = RoutePlanner::with_cost(PlannerConfig::default(), UnitCost);
        let route = planner
            .plan_stops(&[Stop::new("Restaurant"), Stop::new("Shelter A")], 0)
            .unwrap();
        let decision = AdmissionDecision::Accepted { route };
        assert_eq!(
            decision.to_json(),
            json!({
                "status": "Accepted",
                "route": {
                    "stops": ["Restaurant", "Shelter A"],
                    "summary": "Restaurant -> Shelter A",
                    "total_cost": 1.0,
                    "feasible": true
                }
            })
        );
    }
}
