//! ==============================================================================
//! decision.rs - cost-based maintenance recommendation
//! ==============================================================================
//!
//! purpose:
//!     expected_cost = probability * failure_cost, compared against the
//!     inspection and repair costs to pick one of three actions.
//!
//! threshold ordering:
//!     the literal policy checks the inspection threshold ($500K) before the
//!     repair threshold ($2M). any cost above $2M is also above $500K, so the
//!     SCHEDULE_REPAIR branch can never fire. literal is the default because it
//!     is what the dashboard has always shown. the escalating policy checks
//!     the higher threshold first and makes all three outcomes reachable.
//!
//! ==============================================================================

use serde::{Deserialize, Serialize};

pub const FAILURE_COST: f64 = 10_000_000.0;
pub const INSPECTION_COST: f64 = 500_000.0;
pub const REPAIR_COST: f64 = 2_000_000.0;

/// ordered by severity: a later variant is a more drastic action
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    ContinueOperation,
    ScheduleRepair,
    ImmediateInspection,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContinueOperation => "CONTINUE_OPERATION",
            Self::ScheduleRepair => "SCHEDULE_REPAIR",
            Self::ImmediateInspection => "IMMEDIATE_INSPECTION",
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::ContinueOperation => "Continue normal operation with routine monitoring",
            Self::ScheduleRepair => "Plan repair during next maintenance window",
            Self::ImmediateInspection => "Schedule immediate inspection and prepare for shutdown",
        }
    }

    /// dashboard badge colour
    pub fn color(&self) -> &'static str {
        match self {
            Self::ContinueOperation => "success",
            Self::ScheduleRepair => "warning",
            Self::ImmediateInspection => "danger",
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdOrdering {
    /// inspection threshold checked first; repair branch unreachable with default costs
    #[default]
    Literal,
    /// higher threshold checked first; all three outcomes reachable
    Escalating,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Decision {
    pub recommendation: Recommendation,
    pub expected_cost: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostPolicy {
    pub failure_cost: f64,
    pub inspection_cost: f64,
    pub repair_cost: f64,
    pub ordering: ThresholdOrdering,
}

impl Default for CostPolicy {
    fn default() -> Self {
        Self {
            failure_cost: FAILURE_COST,
            inspection_cost: INSPECTION_COST,
            repair_cost: REPAIR_COST,
            ordering: ThresholdOrdering::Literal,
        }
    }
}

impl CostPolicy {
    pub fn decide(&self, probability: f64) -> Decision {
        let expected_cost = probability * self.failure_cost;

        let recommendation = match self.ordering {
            ThresholdOrdering::Literal => {
                if expected_cost > self.inspection_cost {
                    Recommendation::ImmediateInspection
                } else if expected_cost > self.repair_cost {
                    Recommendation::ScheduleRepair
                } else {
                    Recommendation::ContinueOperation
                }
            }
            ThresholdOrdering::Escalating => {
                let upper = self.inspection_cost.max(self.repair_cost);
                let lower = self.inspection_cost.min(self.repair_cost);
                if expected_cost > upper {
                    Recommendation::ImmediateInspection
                } else if expected_cost > lower {
                    Recommendation::ScheduleRepair
                } else {
                    Recommendation::ContinueOperation
                }
            }
        };

        Decision {
            recommendation,
            expected_cost,
        }
    }
}

/// decide with the default costs and literal ordering
pub fn decide(probability: f64) -> Decision {
    CostPolicy::default().decide(probability)
}
