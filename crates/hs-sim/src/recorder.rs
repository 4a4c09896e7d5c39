//! The `Recorder` capability: everything a simulation persists.
//!
//! The simulation never talks to a database or file directly.  It hands row
//! values to a `Recorder`, and reads back exactly two things: a simulation
//! identity's registration and its latest snapshot.  Write failures are
//! logged by the caller and never abort a run.

use thiserror::Error;

use hs_core::{SimId, TrajectoryId};

use crate::Snapshot;
use crate::record::{
    CompletionRecord, EventLogRecord, NewSimulation, NewTrajectory, ParameterChangeRecord,
    SimulationRecord, StateSample, TrajectorySample,
};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("recorder backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0} is not registered")]
    UnknownSimulation(SimId),
}

pub type RecordResult<T> = Result<T, RecordError>;

/// Persistence sink for a simulation and its ensembles.
///
/// Only [`register_simulation`][Self::register_simulation] is required.
/// Writes default to no-ops and queries to "nothing stored", so test doubles
/// override only what they check.
pub trait Recorder {
    /// Allocate a new simulation identity.
    fn register_simulation(&mut self, new: &NewSimulation) -> RecordResult<SimId>;

    fn simulation(&self, _id: SimId) -> RecordResult<Option<SimulationRecord>> {
        Ok(None)
    }

    fn record_completion(&mut self, _rec: &CompletionRecord) -> RecordResult<()> {
        Ok(())
    }

    fn record_state(&mut self, _sample: &StateSample) -> RecordResult<()> {
        Ok(())
    }

    fn record_snapshot(&mut self, _snapshot: &Snapshot) -> RecordResult<()> {
        Ok(())
    }

    fn latest_snapshot(&self, _sim: SimId) -> RecordResult<Option<Snapshot>> {
        Ok(None)
    }

    fn record_event(&mut self, _rec: &EventLogRecord) -> RecordResult<()> {
        Ok(())
    }

    fn record_parameter_change(&mut self, _rec: &ParameterChangeRecord) -> RecordResult<()> {
        Ok(())
    }

    fn register_trajectory(&mut self, _new: &NewTrajectory) -> RecordResult<TrajectoryId> {
        Ok(TrajectoryId::INVALID)
    }

    fn record_trajectory_sample(&mut self, _sample: &TrajectorySample) -> RecordResult<()> {
        Ok(())
    }

    /// Flush and release backend resources.  Idempotent.
    fn finish(&mut self) -> RecordResult<()> {
        Ok(())
    }
}

impl<T: Recorder + ?Sized> Recorder for &mut T {
    fn register_simulation(&mut self, new: &NewSimulation) -> RecordResult<SimId> {
        (**self).register_simulation(new)
    }
    fn simulation(&self, id: SimId) -> RecordResult<Option<SimulationRecord>> {
        (**self).simulation(id)
    }
    fn record_completion(&mut self, rec: &CompletionRecord) -> RecordResult<()> {
        (**self).record_completion(rec)
    }
    fn record_state(&mut self, sample: &StateSample) -> RecordResult<()> {
        (**self).record_state(sample)
    }
    fn record_snapshot(&mut self, snapshot: &Snapshot) -> RecordResult<()> {
        (**self).record_snapshot(snapshot)
    }
    fn latest_snapshot(&self, sim: SimId) -> RecordResult<Option<Snapshot>> {
        (**self).latest_snapshot(sim)
    }
    fn record_event(&mut self, rec: &EventLogRecord) -> RecordResult<()> {
        (**self).record_event(rec)
    }
    fn record_parameter_change(&mut self, rec: &ParameterChangeRecord) -> RecordResult<()> {
        (**self).record_parameter_change(rec)
    }
    fn register_trajectory(&mut self, new: &NewTrajectory) -> RecordResult<TrajectoryId> {
        (**self).register_trajectory(new)
    }
    fn record_trajectory_sample(&mut self, sample: &TrajectorySample) -> RecordResult<()> {
        (**self).record_trajectory_sample(sample)
    }
    fn finish(&mut self) -> RecordResult<()> {
        (**self).finish()
    }
}

// ── NoopRecorder ──────────────────────────────────────────────────────────────

/// Discards everything.  Every registration gets `SimId(0)`.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopRecorder;

impl Recorder for NoopRecorder {
    fn register_simulation(&mut self, _new: &NewSimulation) -> RecordResult<SimId> {
        Ok(SimId(0))
    }
}

// ── MemoryRecorder ────────────────────────────────────────────────────────────

/// Keeps every row in memory.  Used by ensemble members and tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryRecorder {
    pub simulations:        Vec<SimulationRecord>,
    pub completions:        Vec<CompletionRecord>,
    pub states:             Vec<StateSample>,
    pub snapshots:          Vec<Snapshot>,
    pub events:             Vec<EventLogRecord>,
    pub parameter_changes:  Vec<ParameterChangeRecord>,
    pub trajectories:       Vec<(TrajectoryId, NewTrajectory)>,
    pub trajectory_samples: Vec<TrajectorySample>,
    pub finished:           bool,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots_of(&self, sim: SimId) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter().filter(move |s| s.sim_id == sim)
    }
}

impl Recorder for MemoryRecorder {
    fn register_simulation(&mut self, new: &NewSimulation) -> RecordResult<SimId> {
        let id = SimId(self.simulations.len() as u64 + 1);
        self.simulations.push(SimulationRecord::from_new(id, new));
        Ok(id)
    }

    fn simulation(&self, id: SimId) -> RecordResult<Option<SimulationRecord>> {
        Ok(self.simulations.iter().find(|s| s.id == id).cloned())
    }

    fn record_completion(&mut self, rec: &CompletionRecord) -> RecordResult<()> {
        self.completions.push(rec.clone());
        Ok(())
    }

    fn record_state(&mut self, sample: &StateSample) -> RecordResult<()> {
        self.states.push(sample.clone());
        Ok(())
    }

    fn record_snapshot(&mut self, snapshot: &Snapshot) -> RecordResult<()> {
        self.snapshots.push(snapshot.clone());
        Ok(())
    }

    fn latest_snapshot(&self, sim: SimId) -> RecordResult<Option<Snapshot>> {
        Ok(self.snapshots_of(sim).last().cloned())
    }

    fn record_event(&mut self, rec: &EventLogRecord) -> RecordResult<()> {
        self.events.push(rec.clone());
        Ok(())
    }

    fn record_parameter_change(&mut self, rec: &ParameterChangeRecord) -> RecordResult<()> {
        self.parameter_changes.push(rec.clone());
        Ok(())
    }

    fn register_trajectory(&mut self, new: &NewTrajectory) -> RecordResult<TrajectoryId> {
        let id = TrajectoryId(self.trajectories.len() as u64 + 1);
        self.trajectories.push((id, new.clone()));
        Ok(id)
    }

    fn record_trajectory_sample(&mut self, sample: &TrajectorySample) -> RecordResult<()> {
        self.trajectory_samples.push(sample.clone());
        Ok(())
    }

    fn finish(&mut self) -> RecordResult<()> {
        self.finished = true;
        Ok(())
    }
}
