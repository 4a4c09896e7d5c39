//! Demand model for ensemble members, driven by base-simulation history.

use hs_core::{Condition, SimRng};
use hs_demand::{ConditionWeights, DemandContext, DemandModel};

use crate::{BaseStatistics, TrajectoryParams};

/// Completions per condition that count as a neutral history.
const HISTORY_NORMALISER: f64 = 100.0;
const HISTORY_MIN: f64 = 0.3;
const HISTORY_MAX: f64 = 3.0;

const NOISE_SD: f64 = 0.2;
const NOISE_MIN: f64 = 0.1;
const NOISE_MAX: f64 = 3.0;

/// Arrival demand of one ensemble member.
///
/// - rate = base rate × hourly multiplier × noise, noise ~ N(1, 0.2·variance)
///   clamped to [0.1, 3]
/// - weights = base weights × clamp(completions / 100, 0.3, 3) for every
///   condition the base treated, × the member's outbreak/suppression
///   modifiers
/// - treatment durations × the member's treatment modifier
///
/// Calendar factors and live events do not apply; the history already
/// reflects them.
#[derive(Clone, Debug)]
pub struct TrajectoryDemand {
    hourly:             [f64; 24],
    variance:           f64,
    weights:            ConditionWeights,
    treatment_modifier: f64,
}

impl TrajectoryDemand {
    pub fn new(base: &BaseStatistics, params: &TrajectoryParams) -> Self {
        let mut weights = ConditionWeights::base();
        for (&condition, &count) in &base.completions_by_condition {
            let multiplier = (count as f64 / HISTORY_NORMALISER).clamp(HISTORY_MIN, HISTORY_MAX);
            weights.scale(condition, multiplier);
        }
        for (&condition, &modifier) in &params.condition_modifiers {
            weights.scale(condition, modifier);
        }

        Self {
            hourly: base.hourly_multipliers(),
            variance: params.arrival_variance,
            weights,
            treatment_modifier: params.treatment_time_modifier,
        }
    }

    pub fn hourly_multiplier(&self, hour: usize) -> f64 {
        self.hourly.get(hour).copied().unwrap_or(1.0)
    }

    pub fn weight(&self, condition: Condition) -> f64 {
        self.weights.get(condition)
    }
}

impl DemandModel for TrajectoryDemand {
    fn raw_rate(&self, ctx: &DemandContext<'_>, rng: &mut SimRng) -> f64 {
        let noise = rng.normal(1.0, NOISE_SD * self.variance).clamp(NOISE_MIN, NOISE_MAX);
        ctx.base_rate * self.hourly_multiplier(ctx.hour()) * noise
    }

    fn condition_weights(&self, _ctx: &DemandContext<'_>) -> ConditionWeights {
        self.weights.clone()
    }

    fn treatment_factor(&self, _ctx: &DemandContext<'_>) -> f64 {
        self.treatment_modifier
    }
}
