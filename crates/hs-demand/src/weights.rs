//! Catalog-indexed condition weights.

use serde::{Deserialize, Serialize};

use hs_core::{Condition, SimRng};

use crate::Season;

/// One non-negative weight per catalog condition, indexed by
/// [`Condition::index`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConditionWeights(pub [f64; Condition::COUNT]);

impl ConditionWeights {
    pub fn base() -> Self {
        Self(Condition::base_weights())
    }

    /// Base weights adjusted for `season`.
    pub fn seasonal(season: Season) -> Self {
        let mut w = Self::base();
        match season {
            Season::Winter => {
                w.scale(Condition::ViralInfection, 1.7);
                w.scale(Condition::AsthmaAttack, 0.5);
            }
            Season::Spring => {
                w.scale(Condition::AsthmaAttack, 2.0);
                w.scale(Condition::ViralInfection, 0.7);
            }
            Season::Summer => {
                w.scale(Condition::MinorFracture, 1.5);
                w.scale(Condition::ViralInfection, 0.5);
            }
            Season::Autumn => {
                w.scale(Condition::Gastroenteritis, 2.0);
            }
        }
        w
    }

    #[inline]
    pub fn get(&self, c: Condition) -> f64 {
        self.0[c.index()]
    }

    #[inline]
    pub fn set(&mut self, c: Condition, w: f64) {
        self.0[c.index()] = w;
    }

    #[inline]
    pub fn scale(&mut self, c: Condition, factor: f64) {
        self.0[c.index()] *= factor;
    }

    /// Multiply every entry named in `factors`.
    pub fn apply<'a, I>(&mut self, factors: I)
    where
        I: IntoIterator<Item = (&'a Condition, &'a f64)>,
    {
        for (c, f) in factors {
            self.scale(*c, *f);
        }
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Draw a condition.  Falls back to the base catalog weights when these
    /// are degenerate (all zero, negative or non-finite).
    pub fn sample(&self, rng: &mut SimRng) -> Condition {
        let idx = rng
            .weighted_index(&self.0)
            .or_else(|| rng.weighted_index(&Condition::base_weights()))
            .unwrap_or(0);
        Condition::ALL[idx.min(Condition::COUNT - 1)]
    }
}

impl Default for ConditionWeights {
    fn default() -> Self {
        Self::base()
    }
}
