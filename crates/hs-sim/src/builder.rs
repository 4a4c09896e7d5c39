//! Fluent builder for constructing a [`Simulation`].

use std::collections::BTreeMap;

use hs_core::{SimConfig, SimId, SimRng, SimTime, Specialty};
use hs_demand::{CalendarDemand, DemandModel, EventModulator};
use hs_kernel::{Fleet, RoutingPolicy, Scheduler, ShortestQueue};

use crate::record::NewSimulation;
use crate::{
    CheckpointManager, HistoryStats, Recorder, SharedCounters, SimError, SimResult, Simulation,
    StopHandle,
};

/// Fluent builder for [`Simulation<R, D, P>`].
///
/// # Required inputs
///
/// - [`SimConfig`]: fleet size, base rate, seed, sampling intervals
/// - `R: Recorder`: where completions, samples and snapshots go
///
/// # Optional inputs (have defaults)
///
/// | Method                  | Default                                  |
/// |-------------------------|------------------------------------------|
/// | `.demand(d)`            | [`CalendarDemand`]                       |
/// | `.policy(p)`            | [`ShortestQueue`]                        |
/// | `.roster(v)`            | composition from `config.num_doctors`    |
/// | `.resume(id)`           | register a new identity                  |
/// | `.shared_counters(c)`   | none                                     |
/// | `.stop_handle(h)`       | none                                     |
///
/// # Resuming
///
/// A resumed identity keeps the fleet size and base rate it was registered
/// with (or, if a snapshot exists, the ones captured in the latest
/// snapshot).  Requested values that differ are logged and ignored.
///
/// ```rust,ignore
/// let mut sim = SimulationBuilder::new(config, recorder).resume(SimId(3)).build()?;
/// sim.run(SimTime::from_days(60.0))?;
/// ```
pub struct SimulationBuilder<R: Recorder, D: DemandModel = CalendarDemand, P: RoutingPolicy = ShortestQueue> {
    config:   SimConfig,
    recorder: R,
    demand:   D,
    policy:   P,
    roster:   Option<Vec<Specialty>>,
    resume:   Option<SimId>,
    shared:   Option<SharedCounters>,
    stop:     Option<StopHandle>,
}

impl<R: Recorder> SimulationBuilder<R> {
    pub fn new(config: SimConfig, recorder: R) -> Self {
        Self {
            config,
            recorder,
            demand:   CalendarDemand,
            policy:   ShortestQueue,
            roster:   None,
            resume:   None,
            shared:   None,
            stop:     None,
        }
    }
}

impl<R: Recorder, D: DemandModel, P: RoutingPolicy> SimulationBuilder<R, D, P> {
    /// Replace the demand model.
    pub fn demand<D2: DemandModel>(self, demand: D2) -> SimulationBuilder<R, D2, P> {
        SimulationBuilder {
            config:   self.config,
            recorder: self.recorder,
            demand,
            policy:   self.policy,
            roster:   self.roster,
            resume:   self.resume,
            shared:   self.shared,
            stop:     self.stop,
        }
    }

    /// Replace the routing policy.
    pub fn policy<P2: RoutingPolicy>(self, policy: P2) -> SimulationBuilder<R, D, P2> {
        SimulationBuilder {
            config:   self.config,
            recorder: self.recorder,
            demand:   self.demand,
            policy,
            roster:   self.roster,
            resume:   self.resume,
            shared:   self.shared,
            stop:     self.stop,
        }
    }

    /// Use an explicit fleet instead of the default composition.  The
    /// fleet size becomes `roster.len()`.  Ignored when resuming.
    pub fn roster(mut self, roster: Vec<Specialty>) -> Self {
        self.roster = Some(roster);
        self
    }

    /// Continue an existing simulation identity.
    pub fn resume(mut self, id: SimId) -> Self {
        self.resume = Some(id);
        self
    }

    pub fn shared_counters(mut self, counters: SharedCounters) -> Self {
        self.shared = Some(counters);
        self
    }

    pub fn stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Validate inputs, register or restore the identity, and return a
    /// ready-to-run [`Simulation`].
    pub fn build(mut self) -> SimResult<Simulation<R, D, P>> {
        if let Some(roster) = &self.roster {
            if roster.is_empty() {
                return Err(SimError::Config("roster must name at least one specialist".into()));
            }
            if self.resume.is_none() && roster.len() != self.config.num_doctors {
                log::info!(
                    "roster has {} specialists; overriding num_doctors = {}",
                    roster.len(),
                    self.config.num_doctors
                );
                self.config.num_doctors = roster.len();
            }
        }
        self.config.validate()?;

        let mut state = match self.resume {
            Some(id) => self.resume_identity(id)?,
            None => None,
        };

        let id = match &state {
            Some(restored) => restored.id,
            None => self.recorder.register_simulation(&NewSimulation {
                num_doctors:  self.config.num_doctors,
                arrival_rate: self.config.arrival_rate,
                start:        self.config.start,
                seed:         self.config.seed,
            })?,
        };

        let fleet = match (state.as_mut().and_then(|s| s.fleet.take()), &self.roster) {
            (Some(fleet), _) => fleet,
            (None, Some(roster)) if state.is_none() => Fleet::from_roster(roster),
            (None, _) => Fleet::staffed(self.config.num_doctors),
        };

        let restored = state.and_then(|s| s.snapshot);
        let (clock, created, treated, rate, modulator, history) = match restored {
            Some(snap) => (
                snap.clock,
                snap.created,
                snap.treated,
                snap.arrival_rate,
                EventModulator::restore(snap.events, snap.next_event_id),
                snap.history,
            ),
            None => (
                SimTime::ZERO,
                0,
                0,
                self.config.arrival_rate,
                EventModulator::new(),
                HistoryStats::default(),
            ),
        };

        log::info!(
            "{id}: {} specialists, {:.2} patients/hour, starting at {clock}",
            fleet.active_count(),
            rate
        );

        Ok(Simulation {
            id,
            calendar:       self.config.calendar(),
            rng:            SimRng::new(self.config.seed),
            checkpoints:    CheckpointManager::new(self.config.checkpoint_interval_minutes),
            config:         self.config,
            scheduler:      Scheduler::new(clock),
            fleet,
            modulator,
            processes:      BTreeMap::new(),
            next_process:   0,
            next_patient:   created,
            arrival_rate:   rate,
            created,
            treated,
            dropped:        0,
            history,
            recorder:       self.recorder,
            demand:         self.demand,
            policy:         self.policy,
            shared:         self.shared,
            stop:           self.stop,
            started:        false,
            write_failures: 0,
        })
    }

    /// Look up a persisted identity and its latest snapshot.  `None` means
    /// the identity is unknown and a new one will be registered.
    fn resume_identity(&mut self, id: SimId) -> SimResult<Option<Restored>> {
        let Some(record) = self.recorder.simulation(id)? else {
            log::warn!("{id} is not registered; starting a new simulation instead");
            return Ok(None);
        };

        if record.num_doctors != self.config.num_doctors {
            log::warn!(
                "{id} was created with {} doctors; ignoring requested {}",
                record.num_doctors,
                self.config.num_doctors
            );
        }
        if record.arrival_rate != self.config.arrival_rate {
            log::warn!(
                "{id} was created with arrival rate {}; ignoring requested {}",
                record.arrival_rate,
                self.config.arrival_rate
            );
        }
        if self.roster.is_some() {
            log::warn!("{id}: roster ignored on resume");
        }
        self.config.num_doctors = record.num_doctors;
        self.config.arrival_rate = record.arrival_rate;
        self.config.start = record.start;

        let snapshot = CheckpointManager::restore(&self.recorder, id)?;
        let fleet = match &snapshot {
            Some(snap) => {
                log::info!(
                    "{id}: resuming from snapshot at {} (created {}, treated {}, {} queued patients not restored)",
                    snap.clock,
                    snap.created,
                    snap.treated,
                    snap.waiting()
                );
                Some(Fleet::restore(&snap.doctors))
            }
            None => {
                log::info!("{id}: no snapshot found; fresh run under the same identity");
                Some(Fleet::staffed(record.num_doctors))
            }
        };

        Ok(Some(Restored { id, fleet, snapshot }))
    }
}

struct Restored {
    id:       SimId,
    fleet:    Option<Fleet>,
    snapshot: Option<crate::Snapshot>,
}
