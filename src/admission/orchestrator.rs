use super::{AdmissionDecision, RejectionReason};
use crate::config::PipelineConfig;
use crate::quality::QualityGate;
use crate::routing::{Planner, RoutePlanner, RouteRequest};
use tracing::{info, instrument, warn};

/// Runs one submission through the quality gate and, if it passes, the route planner.
///
/// The orchestrator holds only read-only policy, so a single instance can serve any number of
/// concurrent submissions (`&self`, `Send + Sync`).
#[derive(Debug, Clone, Default)]
pub struct AdmissionOrchestrator<P: Planner = RoutePlanner> {
    gate: QualityGate,
    planner: P,
}

impl AdmissionOrchestrator<RoutePlanner> {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(QualityGate::new(config.quality), config.route_planner())
    }
}

impl<P: Planner> AdmissionOrchestrator<P> {
    pub fn new(gate: QualityGate, planner: P) -> Self {
        Self { gate, planner }
    }

    pub fn gate(&self) -> &QualityGate {
        &self.gate
    }

    pub fn planner(&self) -> &P {
        &self.planner
    }

    /// Decides one donation.
    ///
    /// Every failure becomes a rejection: unreadable bytes, a failed quality check (the planner
    /// is not called), or a request the planner cannot route.
    #[instrument(skip_all, fields(bytes = image_bytes.len(), stops = request.stops.len()))]
    pub fn admit(&self, image_bytes: &[u8], request: &RouteRequest) -> AdmissionDecision {
        let verdict = match self.gate.evaluate(image_bytes) {
            Ok(verdict) => verdict,
            Err(error) => {
                warn!(%error, "Image rejected");
                return self.reject(RejectionReason::UnreadableImage);
            }
        };
        if !verdict.passed() {
            return self.reject(RejectionReason::QualityCheckFailed);
        }

        match self.planner.plan(request) {
            Ok(route) => {
                info!(route = %route.describe(), cost = route.total_cost(), "Donation accepted");
                AdmissionDecision::Accepted { route }
            }
            Err(error) => {
                warn!(%error, "Routing failed");
                self.reject(RejectionReason::NoValidRoute)
            }
        }
    }

    fn reject(&self, reason: RejectionReason) -> AdmissionDecision {
        info!(%reason, "Donation rejected");
        AdmissionDecision::Rejected { reason }
    }
}
