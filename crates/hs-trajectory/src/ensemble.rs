//! The ensemble runner.

use hs_core::{MINUTES_PER_DAY, SimConfig, SimId, SimRng, SimTime, TrajectoryId};
use hs_sim::record::{NewTrajectory, TrajectorySample};
use hs_sim::{NoopRecorder, RecordResult, Recorder, SimulationBuilder};

use crate::{BaseStatistics, EnsembleConfig, TrajectoryDemand, TrajectoryParams, TrajectoryResult};

/// Aggregate counters of one member at one sample instant.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MemberSample {
    /// Minutes on the base simulation's timeline.
    pub minutes:          f64,
    pub created:          u64,
    pub treated:          u64,
    pub busy:             usize,
    pub waiting:          usize,
    pub avg_wait_minutes: f64,
}

#[derive(Clone, Debug)]
pub struct MemberResult {
    /// `TrajectoryId::INVALID` until the member is recorded.
    pub trajectory: TrajectoryId,
    pub params:     TrajectoryParams,
    pub samples:    Vec<MemberSample>,
}

impl MemberResult {
    pub fn last(&self) -> Option<&MemberSample> {
        self.samples.last()
    }
}

#[derive(Clone, Debug)]
pub struct EnsembleReport {
    pub base_sim:       SimId,
    pub members:        Vec<MemberResult>,
    /// Recorder writes that failed and were skipped.
    pub write_failures: u64,
}

impl EnsembleReport {
    /// Mean over members of the final treated count.
    pub fn mean_final_treated(&self) -> f64 {
        let finals: Vec<u64> = self.members.iter().filter_map(|m| m.last()).map(|s| s.treated).collect();
        if finals.is_empty() {
            return 0.0;
        }
        finals.iter().sum::<u64>() as f64 / finals.len() as f64
    }
}

/// Runs perturbed copies of a base simulation forward from where it stopped.
///
/// Members are independent simulations with a [`TrajectoryDemand`], the
/// base's fleet size and their own seeds.  They record nothing themselves;
/// the runner samples them at `sample_interval_minutes` and writes every
/// member's metadata and samples to the caller's recorder once all members
/// have finished.
pub struct EnsembleRunner {
    config: EnsembleConfig,
}

impl EnsembleRunner {
    pub fn new(config: EnsembleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    /// Perturbations for every member, drawn from the configured seed.
    pub fn plan(&self, base: &BaseStatistics) -> Vec<TrajectoryParams> {
        let mut root = SimRng::new(self.config.seed);
        (0..self.config.members)
            .map(|i| {
                let mut rng = root.child(i as u64);
                TrajectoryParams::generate(i, &self.config, base, &mut rng)
            })
            .collect()
    }

    /// Validate, run every member, then record the merged results.
    ///
    /// Validation failures return before any member is started.
    pub fn run<R: Recorder + ?Sized>(&self, base: &BaseStatistics, recorder: &mut R) -> TrajectoryResult<EnsembleReport> {
        self.config.validate()?;
        base.validate()?;

        let plan = self.plan(base);
        log::info!(
            "{}: running {} members of {:.1} days from day {:.1}",
            base.sim_id,
            plan.len(),
            self.config.duration_days,
            base.observed_days()
        );

        let mut members = self.run_members(base, plan)?;

        let mut write_failures = 0;
        for member in &mut members {
            if let Err(e) = self.record_member(base, member, recorder) {
                write_failures += 1;
                log::warn!("trajectory {} not fully recorded: {e}", member.params.member);
            }
        }
        if let Err(e) = recorder.finish() {
            write_failures += 1;
            log::warn!("recorder finish failed: {e}");
        }

        let report = EnsembleReport { base_sim: base.sim_id, members, write_failures };
        log::info!(
            "{}: ensemble done, mean final treated {:.1}",
            base.sim_id,
            report.mean_final_treated()
        );
        Ok(report)
    }

    #[cfg(not(feature = "parallel"))]
    fn run_members(&self, base: &BaseStatistics, plan: Vec<TrajectoryParams>) -> TrajectoryResult<Vec<MemberResult>> {
        plan.into_iter().map(|params| run_member(base, params, &self.config)).collect()
    }

    #[cfg(feature = "parallel")]
    fn run_members(&self, base: &BaseStatistics, plan: Vec<TrajectoryParams>) -> TrajectoryResult<Vec<MemberResult>> {
        use rayon::prelude::*;

        plan.into_par_iter().map(|params| run_member(base, params, &self.config)).collect()
    }

    fn record_member<R: Recorder + ?Sized>(
        &self,
        base:     &BaseStatistics,
        member:   &mut MemberResult,
        recorder: &mut R,
    ) -> RecordResult<()> {
        let start = base.observed_minutes;
        member.trajectory = recorder.register_trajectory(&NewTrajectory {
            base_sim:      base.sim_id,
            params:        serde_json::to_value(&member.params)?,
            start_minutes: start,
            end_minutes:   start + self.config.duration_days * MINUTES_PER_DAY,
        })?;
        for s in &member.samples {
            recorder.record_trajectory_sample(&TrajectorySample {
                trajectory:       member.trajectory,
                minutes:          s.minutes,
                created:          s.created,
                treated:          s.treated,
                busy:             s.busy,
                waiting:          s.waiting,
                avg_wait_minutes: s.avg_wait_minutes,
            })?;
        }
        Ok(())
    }
}

/// Run one member to the horizon, sampling at every interval.
fn run_member(base: &BaseStatistics, params: TrajectoryParams, config: &EnsembleConfig) -> TrajectoryResult<MemberResult> {
    let sim_config = SimConfig {
        start:                       base.observed_until,
        num_doctors:                 base.num_doctors,
        arrival_rate:                params.arrival_rate,
        seed:                        params.seed,
        state_interval_minutes:      0.0,
        checkpoint_interval_minutes: 0.0,
    };
    let mut sim = SimulationBuilder::new(sim_config, NoopRecorder)
        .demand(TrajectoryDemand::new(base, &params))
        .build()?;

    let horizon = config.duration_days * MINUTES_PER_DAY;
    let interval = config.sample_interval_minutes;
    // Sample instants are k * interval; the tolerance keeps an exact final
    // step that division rounds just below an integer.
    let steps = (horizon / interval + 1e-9).floor() as u64;
    let mut samples = Vec::with_capacity(steps as usize);
    for k in 1..=steps {
        let t = (k as f64 * interval).min(horizon);
        sim.run_until(SimTime(t))?;
        samples.push(MemberSample {
            minutes:          base.observed_minutes + t,
            created:          sim.patients_total(),
            treated:          sim.patients_treated(),
            busy:             sim.busy_count(),
            waiting:          sim.waiting_count(),
            avg_wait_minutes: sim.average_current_wait(),
        });
    }
    log::debug!(
        "member {}: created {}, treated {}",
        params.member,
        sim.patients_total(),
        sim.patients_treated()
    );

    Ok(MemberResult { trajectory: TrajectoryId::INVALID, params, samples })
}
