//! Ensemble configuration and per-member perturbations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use hs_core::{Condition, SimRng};

use crate::{BaseStatistics, TrajectoryError, TrajectoryResult};

/// How many members to run, for how long, and how much to perturb them.
///
/// Ranges are inclusive `[low, high]` bounds of a uniform draw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    pub members:                 usize,
    pub duration_days:           f64,
    pub seed:                    u64,
    pub sample_interval_minutes: f64,
    pub variance_range:          (f64, f64),
    pub treatment_range:         (f64, f64),
    pub outbreak_probability:    f64,
    pub outbreak_range:          (f64, f64),
    pub suppression_probability: f64,
    pub suppression_range:       (f64, f64),
    pub seasonal_probability:    f64,
    pub seasonal_range:          (f64, f64),
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            members:                 50,
            duration_days:           30.0,
            seed:                    42,
            sample_interval_minutes: 60.0,
            variance_range:          (0.8, 1.3),
            treatment_range:         (0.9, 1.2),
            outbreak_probability:    0.3,
            outbreak_range:          (1.5, 3.0),
            suppression_probability: 0.2,
            suppression_range:       (0.3, 0.7),
            seasonal_probability:    0.4,
            seasonal_range:          (0.7, 1.4),
        }
    }
}

impl EnsembleConfig {
    pub fn validate(&self) -> TrajectoryResult<()> {
        let bad = |msg: String| Err(TrajectoryError::Config(msg));

        if !self.duration_days.is_finite() || self.duration_days <= 0.0 {
            return bad(format!("duration_days must be positive, got {}", self.duration_days));
        }
        if !self.sample_interval_minutes.is_finite() || self.sample_interval_minutes <= 0.0 {
            return bad(format!(
                "sample_interval_minutes must be positive, got {}",
                self.sample_interval_minutes
            ));
        }
        for (name, p) in [
            ("outbreak_probability", self.outbreak_probability),
            ("suppression_probability", self.suppression_probability),
            ("seasonal_probability", self.seasonal_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return bad(format!("{name} must lie in [0, 1], got {p}"));
            }
        }
        for (name, (lo, hi)) in [
            ("variance_range", self.variance_range),
            ("treatment_range", self.treatment_range),
            ("outbreak_range", self.outbreak_range),
            ("suppression_range", self.suppression_range),
            ("seasonal_range", self.seasonal_range),
        ] {
            if !lo.is_finite() || !hi.is_finite() || lo <= 0.0 || lo > hi {
                return bad(format!("{name} must satisfy 0 < low <= high, got ({lo}, {hi})"));
            }
        }
        Ok(())
    }
}

/// The perturbed inputs of one ensemble member.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryParams {
    pub member:                  usize,
    /// Seed of the member's own simulation RNG.
    pub seed:                    u64,
    /// Base arrival rate, possibly shifted seasonally.
    pub arrival_rate:            f64,
    /// Scales the standard deviation of per-arrival rate noise.
    pub arrival_variance:        f64,
    pub treatment_time_modifier: f64,
    /// Outbreak and suppression multipliers on condition weights.
    pub condition_modifiers:     BTreeMap<Condition, f64>,
}

impl TrajectoryParams {
    /// Draw one member's perturbations from `rng`.
    pub fn generate(member: usize, config: &EnsembleConfig, base: &BaseStatistics, rng: &mut SimRng) -> Self {
        let seed = rng.gen_range(0..=u64::MAX);
        let arrival_variance = draw(rng, config.variance_range);
        let treatment_time_modifier = draw(rng, config.treatment_range);

        let mut condition_modifiers = BTreeMap::new();
        let mut outbreak = None;
        if rng.gen_bool(config.outbreak_probability) {
            if let Some(&c) = rng.choose(&Condition::ALL) {
                condition_modifiers.insert(c, draw(rng, config.outbreak_range));
                outbreak = Some(c);
            }
        }
        if rng.gen_bool(config.suppression_probability) {
            let others: Vec<Condition> = Condition::ALL.into_iter().filter(|&c| Some(c) != outbreak).collect();
            if let Some(&c) = rng.choose(&others) {
                condition_modifiers.insert(c, draw(rng, config.suppression_range));
            }
        }

        let mut arrival_rate = base.arrival_rate;
        if rng.gen_bool(config.seasonal_probability) {
            arrival_rate *= draw(rng, config.seasonal_range);
        }

        Self {
            member,
            seed,
            arrival_rate,
            arrival_variance,
            treatment_time_modifier,
            condition_modifiers,
        }
    }
}

fn draw(rng: &mut SimRng, (lo, hi): (f64, f64)) -> f64 {
    if lo < hi { rng.gen_range(lo..hi) } else { lo }
}
