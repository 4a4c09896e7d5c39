//! Snapshots and the checkpoint manager.
//!
//! A [`Snapshot`] is the complete resumable state of a simulation identity
//! minus in-flight patients: counters, arrival rate, every specialist's
//! served count, the active events and the accumulated history.  Queues are
//! not captured; a resumed run starts with every specialist free.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use hs_core::{EventId, SimId, SimTime};
use hs_demand::ActiveEvent;
use hs_kernel::DoctorState;

use crate::{HistoryStats, RecordResult, Recorder};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub sim_id:        SimId,
    pub clock:         SimTime,
    pub taken_at:      NaiveDateTime,
    pub created:       u64,
    pub treated:       u64,
    pub arrival_rate:  f64,
    pub doctors:       Vec<DoctorState>,
    pub events:        Vec<ActiveEvent>,
    pub next_event_id: EventId,
    #[serde(default)]
    pub history:       HistoryStats,
}

impl Snapshot {
    /// Active (non-retired) specialists at capture time.
    pub fn active_doctors(&self) -> usize {
        self.doctors.iter().filter(|d| !d.retired).count()
    }

    /// Busy specialists at capture time.
    pub fn busy_doctors(&self) -> usize {
        self.doctors.iter().filter(|d| d.busy).count()
    }

    /// Patients waiting at capture time.  They are not restored.
    pub fn waiting(&self) -> usize {
        self.doctors.iter().map(|d| d.queue_len).sum()
    }
}

/// Decides when periodic snapshots are due and hands them to the recorder.
#[derive(Clone, Debug)]
pub struct CheckpointManager {
    interval_minutes: f64,
    written:          u64,
    last:             Option<SimTime>,
}

impl CheckpointManager {
    /// `interval_minutes == 0` disables periodic checkpoints; explicit and
    /// shutdown checkpoints still happen.
    pub fn new(interval_minutes: f64) -> Self {
        Self { interval_minutes, written: 0, last: None }
    }

    pub fn is_periodic(&self) -> bool {
        self.interval_minutes > 0.0
    }

    pub fn interval_minutes(&self) -> f64 {
        self.interval_minutes
    }

    /// Snapshots successfully handed to the recorder.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn last(&self) -> Option<SimTime> {
        self.last
    }

    /// Persist `snapshot`.
    pub fn snapshot<R: Recorder + ?Sized>(&mut self, recorder: &mut R, snapshot: &Snapshot) -> RecordResult<()> {
        recorder.record_snapshot(snapshot)?;
        self.written += 1;
        self.last = Some(snapshot.clock);
        log::debug!(
            "checkpoint {} for {} at {} (created {}, treated {})",
            self.written,
            snapshot.sim_id,
            snapshot.clock,
            snapshot.created,
            snapshot.treated
        );
        Ok(())
    }

    /// Most recent snapshot for `sim`, if any was ever written.
    pub fn restore<R: Recorder + ?Sized>(recorder: &R, sim: SimId) -> RecordResult<Option<Snapshot>> {
        recorder.latest_snapshot(sim)
    }
}
