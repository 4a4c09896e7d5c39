//! Statistics extracted from a base simulation.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use hs_core::{Condition, MINUTES_PER_DAY, SimId};
use hs_demand::DemandModel;
use hs_kernel::RoutingPolicy;
use hs_sim::{Recorder, Simulation, Snapshot};

use crate::{TrajectoryError, TrajectoryResult};

/// A base simulation must have observed at least this many days.
pub const MIN_BASE_DAYS: f64 = 30.0;

/// What an ensemble learns from its base simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaseStatistics {
    pub sim_id:                   SimId,
    /// Active specialists when the statistics were taken.
    pub num_doctors:              usize,
    /// Base arrival rate, patients per hour.
    pub arrival_rate:             f64,
    /// Simulated minutes the base has covered.
    pub observed_minutes:         f64,
    /// Calendar instant at the end of the observed span.  Members start here.
    pub observed_until:           NaiveDateTime,
    pub completions_by_condition: BTreeMap<Condition, u64>,
    pub arrivals_by_hour:         [u64; 24],
}

impl BaseStatistics {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            sim_id:                   snapshot.sim_id,
            num_doctors:              snapshot.active_doctors(),
            arrival_rate:             snapshot.arrival_rate,
            observed_minutes:         snapshot.clock.0,
            observed_until:           snapshot.taken_at,
            completions_by_condition: snapshot.history.completions_by_condition.clone(),
            arrivals_by_hour:         snapshot.history.arrivals_by_hour,
        }
    }

    /// Statistics of a simulation still in memory.
    pub fn from_simulation<R, D, P>(sim: &Simulation<R, D, P>) -> Self
    where
        R: Recorder,
        D: DemandModel,
        P: RoutingPolicy,
    {
        let now = sim.now();
        Self {
            sim_id:                   sim.id(),
            num_doctors:              sim.fleet().active_count(),
            arrival_rate:             sim.arrival_rate(),
            observed_minutes:         now.0,
            observed_until:           sim.calendar().instant(now),
            completions_by_condition: sim.history().completions_by_condition.clone(),
            arrivals_by_hour:         sim.history().arrivals_by_hour,
        }
    }

    /// Statistics from the latest persisted snapshot of `sim`.  A registered
    /// identity without snapshots has observed nothing.
    pub fn load<R: Recorder + ?Sized>(recorder: &R, sim: SimId) -> TrajectoryResult<Self> {
        let record = recorder.simulation(sim)?.ok_or(TrajectoryError::UnknownSimulation(sim))?;
        match recorder.latest_snapshot(sim)? {
            Some(snapshot) => Ok(Self::from_snapshot(&snapshot)),
            None => Ok(Self {
                sim_id:                   sim,
                num_doctors:              record.num_doctors,
                arrival_rate:             record.arrival_rate,
                observed_minutes:         0.0,
                observed_until:           record.start,
                completions_by_condition: BTreeMap::new(),
                arrivals_by_hour:         [0; 24],
            }),
        }
    }

    /// Completions the base has recorded across all conditions.
    pub fn history_total(&self) -> u64 {
        self.completions_by_condition.values().sum()
    }

    pub fn observed_days(&self) -> f64 {
        self.observed_minutes / MINUTES_PER_DAY
    }

    /// Reject a base that has covered fewer than [`MIN_BASE_DAYS`].
    pub fn validate(&self) -> TrajectoryResult<()> {
        if self.observed_minutes < MIN_BASE_DAYS * MINUTES_PER_DAY {
            return Err(TrajectoryError::BaseTooShort { days: self.observed_days(), required: MIN_BASE_DAYS });
        }
        Ok(())
    }

    /// Arrival-rate multiplier for each hour of day: the hour's count over
    /// the mean of observed hours.  Hours never observed get 1.
    pub fn hourly_multipliers(&self) -> [f64; 24] {
        let observed: Vec<u64> = self.arrivals_by_hour.iter().copied().filter(|&n| n > 0).collect();
        let mut out = [1.0; 24];
        if observed.is_empty() {
            return out;
        }
        let mean = observed.iter().sum::<u64>() as f64 / observed.len() as f64;
        for (slot, &n) in out.iter_mut().zip(&self.arrivals_by_hour) {
            if n > 0 {
                *slot = n as f64 / mean;
            }
        }
        out
    }
}
