//! Arrival-process arithmetic shared by every demand model.

use hs_core::{Condition, SimRng};

use crate::ConditionWeights;

/// Busy fraction above which arrivals are throttled.
pub const THROTTLE_THRESHOLD: f64 = 0.9;
pub const THROTTLE_FACTOR: f64 = 0.7;
/// Lower bound on the effective rate, patients per hour.
pub const MIN_RATE: f64 = 1.0;

/// Apply the occupancy throttle and the rate floor to a raw rate.
///
/// Non-finite or non-positive raw rates collapse to the floor.
pub fn effective_rate(raw: f64, busy: usize, active: usize) -> f64 {
    let raw = if raw.is_finite() { raw } else { MIN_RATE };
    let throttled = if busy as f64 > THROTTLE_THRESHOLD * active as f64 {
        raw * THROTTLE_FACTOR
    } else {
        raw
    };
    throttled.max(MIN_RATE)
}

/// Minutes until the next arrival at `rate` patients per hour.
pub fn interarrival_minutes(rate: f64, rng: &mut SimRng) -> f64 {
    rng.exponential(60.0 / rate.max(MIN_RATE))
}

/// Whole-minute treatment duration, at least one minute.
pub fn treatment_minutes(condition: Condition, factor: f64, rng: &mut SimRng) -> f64 {
    let mean = condition.mean_treatment_minutes() * factor;
    let draw = rng.exponential(mean).floor();
    if draw.is_finite() { draw.max(1.0) } else { 1.0 }
}

/// A freshly drawn patient profile.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ArrivalDraw {
    pub condition:         Condition,
    pub treatment_minutes: f64,
}

/// Draw a condition from `weights` and its treatment duration.
pub fn draw_patient(weights: &ConditionWeights, treatment_factor: f64, rng: &mut SimRng) -> ArrivalDraw {
    let condition = weights.sample(rng);
    ArrivalDraw {
        condition,
        treatment_minutes: treatment_minutes(condition, treatment_factor, rng),
    }
}
