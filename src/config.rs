//! Construction-time configuration.
//!
//! Every tunable of the pipeline lives here: quality thresholds, the routing cost model and
//! planner flags, and the tracking hub settings. All sections default to the documented values,
//! so a partial JSON document is enough:
//!
//! ```json
//! { "quality": { "min_brightness": 55.0 }, "routing": { "round_trip": true } }
//! ```

use crate::quality::QualityPolicy;
use crate::routing::{GeoCost, PlannerConfig, RoutePlanner, UnitCost};
use crate::tracking::HubConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Configuration parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Arc cost model used by the default planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostModel {
    /// Every arc costs one unit.
    Unit,
    /// Great-circle kilometres, unit cost for stops without coordinates.
    #[default]
    Geo,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub cost_model: CostModel,
    #[serde(flatten)]
    pub planner: PlannerConfig,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub quality: QualityPolicy,
    pub routing: RoutingConfig,
    pub tracking: HubConfig,
}

impl PipelineConfig {
    /// Parses and validates a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let QualityPolicy { min_brightness, min_sharpness } = self.quality;
        if !min_brightness.is_finite() || !(0.0..=255.0).contains(&min_brightness) {
            return Err(ConfigError::Invalid(format!(
                "min_brightness must be within 0..=255, got {min_brightness}"
            )));
        }
        if !min_sharpness.is_finite() || min_sharpness < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "min_sharpness must be a non-negative number, got {min_sharpness}"
            )));
        }
        if self.tracking.channel_capacity == 0 {
            return Err(ConfigError::Invalid("channel_capacity must be at least 1".into()));
        }
        if self.tracking.outbox_capacity == 0 {
            return Err(ConfigError::Invalid("outbox_capacity must be at least 1".into()));
        }
        if self.tracking.send_timeout_ms == 0 {
            return Err(ConfigError::Invalid("send_timeout_ms must be at least 1".into()));
        }
        Ok(())
    }

    /// Planner built from the routing section.
    pub fn route_planner(&self) -> RoutePlanner {
        match self.routing.cost_model {
            CostModel::Unit => RoutePlanner::with_cost(self.routing.planner, UnitCost),
            CostModel::Geo => RoutePlanner::with_cost(self.routing.planner, GeoCost),
        }
    }
}
