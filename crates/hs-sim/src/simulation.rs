//! The `Simulation` struct and its dispatch loop.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use hs_core::{EventId, ProcessId, SimCalendar, SimConfig, SimId, SimRng, SimTime};
use hs_demand::{CalendarDemand, DemandModel, EventKind, EventModulator, EventParams};
use hs_kernel::{Fleet, RoutingPolicy, Scheduler, ShortestQueue};

use crate::process::{ArrivalPhase, Process};
use crate::record::{EventLogRecord, ParameterChangeRecord, StateSample};
use crate::shared::CounterReading;
use crate::{
    CheckpointManager, HistoryStats, RecordResult, Recorder, SharedCounters, SimError, SimResult,
    Snapshot, StopHandle,
};

/// Why [`Simulation::run_until`] returned.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every wake-up due at or before the target was dispatched.
    Horizon,
    /// A [`StopHandle`] asked for an early stop.
    Stopped,
}

/// One hospital simulation run.
///
/// `Simulation<R, D, P>` owns the clock, the specialist fleet, the event set
/// and every live process, and drives them in wake-up order:
///
/// 1. **Arrivals**: one generator process sleeps for exponential gaps and
///    spawns a journey per patient.
/// 2. **Journeys**: route, queue, treat, record, release.
/// 3. **Collector**: samples hospital state every
///    `config.state_interval_minutes`.
/// 4. **Checkpointer**: persists a [`Snapshot`] every
///    `config.checkpoint_interval_minutes`.
///
/// Create via [`SimulationBuilder`][crate::SimulationBuilder].
pub struct Simulation<R: Recorder, D: DemandModel = CalendarDemand, P: RoutingPolicy = ShortestQueue> {
    pub(crate) id:             SimId,
    pub(crate) config:         SimConfig,
    pub(crate) calendar:       SimCalendar,
    pub(crate) scheduler:      Scheduler,
    pub(crate) fleet:          Fleet,
    pub(crate) modulator:      EventModulator,
    pub(crate) processes:      BTreeMap<ProcessId, Process>,
    pub(crate) next_process:   u64,
    pub(crate) next_patient:   u64,
    /// Current base arrival rate, patients per hour.
    pub(crate) arrival_rate:   f64,
    pub(crate) created:        u64,
    pub(crate) treated:        u64,
    pub(crate) dropped:        u64,
    pub(crate) history:        HistoryStats,
    pub(crate) checkpoints:    CheckpointManager,
    pub(crate) recorder:       R,
    pub(crate) demand:         D,
    pub(crate) policy:         P,
    pub(crate) rng:            SimRng,
    pub(crate) shared:         Option<SharedCounters>,
    pub(crate) stop:           Option<StopHandle>,
    pub(crate) started:        bool,
    pub(crate) write_failures: u64,
}

impl<R: Recorder, D: DemandModel, P: RoutingPolicy> Simulation<R, D, P> {
    // ── Running ───────────────────────────────────────────────────────────

    /// Dispatch every wake-up due at or before `target`, then leave the
    /// clock at `target`.  Can be called repeatedly with increasing targets.
    pub fn run_until(&mut self, target: SimTime) -> SimResult<RunOutcome> {
        self.start_processes()?;

        let outcome = loop {
            if self.stop.as_ref().is_some_and(StopHandle::is_requested) {
                log::info!("{}: stop requested at {}", self.id, self.now());
                break RunOutcome::Stopped;
            }
            let Some((_, pid)) = self.scheduler.pop_due(target) else {
                self.scheduler.advance_to(target);
                break RunOutcome::Horizon;
            };
            self.dispatch(pid)?;
            self.publish();
        };
        self.publish();
        Ok(outcome)
    }

    /// [`run_until`][Self::run_until] `minutes` past the current clock.
    pub fn run_for(&mut self, minutes: f64) -> SimResult<RunOutcome> {
        if !minutes.is_finite() || minutes < 0.0 {
            return Err(SimError::Config(format!("run length must be finite and >= 0, got {minutes}")));
        }
        self.run_until(self.now().after(minutes))
    }

    /// Run to `horizon`, then shut down gracefully (final snapshot, recorder
    /// finish).
    pub fn run(&mut self, horizon: SimTime) -> SimResult<RunOutcome> {
        let outcome = self.run_until(horizon)?;
        self.shutdown();
        Ok(outcome)
    }

    /// Write a final snapshot and finish the recorder.
    pub fn shutdown(&mut self) {
        self.checkpoint();
        let finished = self.recorder.finish();
        self.note_write("recorder finish", finished);
        log::info!(
            "{} shut down at {}: created {}, treated {}, waiting {}",
            self.id,
            self.now(),
            self.created,
            self.treated,
            self.fleet.waiting_count()
        );
    }

    // ── Checkpoints ───────────────────────────────────────────────────────

    /// Capture the current resumable state.
    pub fn capture(&self) -> Snapshot {
        let now = self.now();
        Snapshot {
            sim_id:        self.id,
            clock:         now,
            taken_at:      self.calendar.instant(now),
            created:       self.created,
            treated:       self.treated,
            arrival_rate:  self.arrival_rate,
            doctors:       self.fleet.states(),
            events:        self.modulator.snapshot(),
            next_event_id: self.modulator.next_id(),
            history:       self.history.clone(),
        }
    }

    /// Capture and persist a snapshot now.  A recorder failure is logged
    /// and the snapshot is still returned.
    pub fn checkpoint(&mut self) -> Snapshot {
        let snapshot = self.capture();
        let written = self.checkpoints.snapshot(&mut self.recorder, &snapshot);
        self.note_write("snapshot", written);
        snapshot
    }

    // ── Events and parameters ─────────────────────────────────────────────

    /// Validate and activate an event from a loosely typed parameter bag.
    ///
    /// The logged parameters are the validated ones, defaults filled in.
    /// Nothing is activated unless they also serialize.
    pub fn add_event(&mut self, kind: EventKind, params: &Value, duration_minutes: f64) -> SimResult<EventId> {
        let typed = EventParams::from_bag(kind, params)?;
        let logged = serde_json::to_value(&typed)?;
        let now = self.now();
        let event = self.modulator.add(typed, duration_minutes, now)?;
        let rec = EventLogRecord {
            sim_id:        self.id,
            event_id:      event.id,
            kind:          event.kind(),
            params:        logged,
            start_minutes: event.start.0,
            end_minutes:   event.expires.0,
            start_time:    self.calendar.instant(event.start),
            end_time:      self.calendar.instant(event.expires),
        };
        let written = self.recorder.record_event(&rec);
        self.note_write("event log", written);
        Ok(event.id)
    }

    /// Change the base arrival rate and/or fleet size mid-run.
    ///
    /// Growth adds the specialty furthest below its target share; shrinking
    /// retires idle specialists only, so the fleet may end up larger than
    /// asked.  Returns the change record, or `None` if nothing changed.
    pub fn update_parameters(
        &mut self,
        arrival_rate: Option<f64>,
        num_doctors:  Option<usize>,
    ) -> SimResult<Option<ParameterChangeRecord>> {
        if let Some(rate) = arrival_rate.filter(|r| !r.is_finite() || *r <= 0.0) {
            return Err(SimError::Config(format!("arrival_rate must be positive and finite, got {rate}")));
        }
        if num_doctors == Some(0) {
            return Err(SimError::Config("num_doctors must be at least 1".into()));
        }

        let mut old_values = serde_json::Map::new();
        let mut new_values = serde_json::Map::new();

        if let Some(rate) = arrival_rate.filter(|r| *r != self.arrival_rate) {
            old_values.insert("arrival_rate".into(), json!(self.arrival_rate));
            new_values.insert("arrival_rate".into(), json!(rate));
            self.arrival_rate = rate;
        }

        if let Some(target) = num_doctors {
            let before = self.fleet.active_count();
            if target > before {
                self.fleet.grow(target - before);
            } else if target < before {
                self.fleet.shrink(before - target);
            }
            let after = self.fleet.active_count();
            if after != before {
                old_values.insert("num_doctors".into(), json!(before));
                new_values.insert("num_doctors".into(), json!(after));
            }
        }

        if new_values.is_empty() {
            return Ok(None);
        }

        let now = self.now();
        let rec = ParameterChangeRecord {
            sim_id:     self.id,
            minutes:    now.0,
            time:       self.calendar.instant(now),
            old_values: Value::Object(old_values),
            new_values: Value::Object(new_values),
        };
        log::info!("{}: parameters changed at {now}: {} -> {}", self.id, rec.old_values, rec.new_values);
        let written = self.recorder.record_parameter_change(&rec);
        self.note_write("parameter change", written);
        Ok(Some(rec))
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn id(&self) -> SimId {
        self.id
    }

    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn calendar(&self) -> &SimCalendar {
        &self.calendar
    }

    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    pub fn modulator(&self) -> &EventModulator {
        &self.modulator
    }

    pub fn arrival_rate(&self) -> f64 {
        self.arrival_rate
    }

    /// Patients created since the identity was first registered.
    pub fn patients_total(&self) -> u64 {
        self.created
    }

    /// Patients treated to completion since the identity was first
    /// registered.
    pub fn patients_treated(&self) -> u64 {
        self.treated
    }

    /// Patients dropped because no specialist was active.
    pub fn patients_dropped(&self) -> u64 {
        self.dropped
    }

    pub fn busy_count(&self) -> usize {
        self.fleet.busy_count()
    }

    pub fn waiting_count(&self) -> usize {
        self.fleet.waiting_count()
    }

    /// Mean time already spent waiting by patients not yet in treatment.
    pub fn average_current_wait(&self) -> f64 {
        let now = self.now();
        let (sum, n) = self
            .processes
            .values()
            .filter_map(|p| match p {
                Process::Journey(j) => j.waiting_for(now),
                _ => None,
            })
            .fold((0.0, 0usize), |(s, n), w| (s + w, n + 1));
        if n == 0 { 0.0 } else { sum / n as f64 }
    }

    pub fn history(&self) -> &HistoryStats {
        &self.history
    }

    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    /// Recorder writes that failed and were skipped.
    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut R {
        &mut self.recorder
    }

    pub fn into_recorder(self) -> R {
        self.recorder
    }

    // ── Internals ─────────────────────────────────────────────────────────

    pub(crate) fn alloc_process(&mut self) -> ProcessId {
        let pid = ProcessId(self.next_process);
        self.next_process += 1;
        pid
    }

    /// Spawn the long-lived processes on the first run call.
    fn start_processes(&mut self) -> SimResult<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;

        let arrivals = self.alloc_process();
        self.processes.insert(arrivals, Process::Arrivals(ArrivalPhase::Starting));
        self.scheduler.schedule_now(arrivals);

        if self.config.state_interval_minutes > 0.0 {
            let pid = self.alloc_process();
            self.processes.insert(pid, Process::Collector);
            self.scheduler.schedule_timeout(pid, self.config.state_interval_minutes)?;
        }
        if self.checkpoints.is_periodic() {
            let pid = self.alloc_process();
            self.processes.insert(pid, Process::Checkpointer);
            self.scheduler.schedule_timeout(pid, self.checkpoints.interval_minutes())?;
        }
        log::debug!("{}: processes started at {}", self.id, self.now());
        Ok(())
    }

    fn dispatch(&mut self, pid: ProcessId) -> SimResult<()> {
        let Some(process) = self.processes.remove(&pid) else {
            log::debug!("{}: stale wake-up for {pid}", self.id);
            return Ok(());
        };

        let next = match process {
            Process::Arrivals(phase) => Some(Process::Arrivals(self.step_arrivals(pid, phase)?)),
            Process::Journey(journey) => self.step_journey(pid, journey)?.map(Process::Journey),
            Process::Collector => {
                self.sample_state();
                self.scheduler.schedule_timeout(pid, self.config.state_interval_minutes)?;
                Some(Process::Collector)
            }
            Process::Checkpointer => {
                self.checkpoint();
                self.scheduler.schedule_timeout(pid, self.checkpoints.interval_minutes())?;
                Some(Process::Checkpointer)
            }
        };

        if let Some(process) = next {
            self.processes.insert(pid, process);
        }
        Ok(())
    }

    fn sample_state(&mut self) {
        let now = self.now();
        let sample = StateSample {
            sim_id:        self.id,
            minutes:       now.0,
            time:          self.calendar.instant(now),
            created:       self.created,
            treated:       self.treated,
            busy:          self.fleet.busy_count(),
            waiting:       self.fleet.waiting_count(),
            active_events: self.modulator.len(),
        };
        let written = self.recorder.record_state(&sample);
        self.note_write("state sample", written);
    }

    fn publish(&self) {
        if let Some(shared) = &self.shared {
            shared.publish(CounterReading {
                created: self.created,
                treated: self.treated,
                busy:    self.fleet.busy_count(),
                waiting: self.fleet.waiting_count(),
                clock:   self.now(),
            });
        }
    }

    /// Log and count a failed recorder write; the run continues.
    pub(crate) fn note_write(&mut self, what: &str, result: RecordResult<()>) {
        if let Err(e) = result {
            self.write_failures += 1;
            log::warn!("{}: {what} not recorded: {e}", self.id);
        }
    }
}
