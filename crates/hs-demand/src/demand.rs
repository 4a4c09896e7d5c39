//! The `DemandModel` trait: how raw arrival demand is computed.

use hs_core::{SimCalendar, SimRng, SimTime};

use crate::factors::{self, Season};
use crate::{ConditionWeights, EventEffects};

/// Read-only inputs available to a demand model at one arrival iteration.
pub struct DemandContext<'a> {
    pub now:       SimTime,
    pub calendar:  &'a SimCalendar,
    /// Current base arrival rate, patients per hour.  Changes when the run's
    /// parameters are updated mid-flight.
    pub base_rate: f64,
    /// Event effects composed at the start of this iteration.
    pub effects:   &'a EventEffects,
}

impl DemandContext<'_> {
    pub fn month(&self) -> u32 {
        self.calendar.month(self.now)
    }

    pub fn hour(&self) -> usize {
        self.calendar.hour(self.now)
    }
}

/// Pluggable arrival demand.
///
/// The simulation calls the three methods once per arrival iteration:
/// `raw_rate` before drawing the inter-arrival gap, `condition_weights` and
/// `treatment_factor` when the patient materialises.  Occupancy throttling
/// and the 1/hour floor are applied by the caller.
pub trait DemandModel {
    /// Unthrottled arrival rate in patients per hour.
    fn raw_rate(&self, ctx: &DemandContext<'_>, rng: &mut SimRng) -> f64;

    /// Condition weights, event overrides included.
    fn condition_weights(&self, ctx: &DemandContext<'_>) -> ConditionWeights;

    /// Multiplier on the condition's mean treatment duration.
    fn treatment_factor(&self, ctx: &DemandContext<'_>) -> f64 {
        ctx.effects.treatment_factor
    }
}

/// Calendar-driven demand: the default for live simulations.
#[derive(Copy, Clone, Debug, Default)]
pub struct CalendarDemand;

impl DemandModel for CalendarDemand {
    fn raw_rate(&self, ctx: &DemandContext<'_>, _rng: &mut SimRng) -> f64 {
        ctx.base_rate * factors::calendar_factor(ctx.calendar, ctx.now) * ctx.effects.arrival_factor
    }

    fn condition_weights(&self, ctx: &DemandContext<'_>) -> ConditionWeights {
        let mut w = ConditionWeights::seasonal(Season::from_month(ctx.month()));
        w.apply(&ctx.effects.weight_overrides);
        w
    }
}
