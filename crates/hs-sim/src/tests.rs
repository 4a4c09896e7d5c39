//! Integration tests for hs-sim.

use serde_json::json;

use hs_core::{Condition, SimConfig, SimId, SimRng, SimTime, Specialty};
use hs_demand::{ConditionWeights, DemandContext, DemandModel, EventKind};

use crate::record::{CompletionRecord, NewSimulation};
use crate::{
    MemoryRecorder, RecordError, RecordResult, Recorder, RunOutcome, SharedCounters, Simulation,
    SimulationBuilder, Snapshot, StopHandle,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn test_config(num_doctors: usize) -> SimConfig {
    init_logging();
    SimConfig {
        num_doctors,
        seed: 42,
        state_interval_minutes: 0.0,
        checkpoint_interval_minutes: 0.0,
        ..SimConfig::default()
    }
}

fn build(config: SimConfig) -> Simulation<MemoryRecorder> {
    SimulationBuilder::new(config, MemoryRecorder::new()).build().unwrap()
}

/// Demand that only ever produces one condition at a fixed raw rate.
struct Only(Condition, f64);

impl DemandModel for Only {
    fn raw_rate(&self, _ctx: &DemandContext<'_>, _rng: &mut SimRng) -> f64 {
        self.1
    }

    fn condition_weights(&self, _ctx: &DemandContext<'_>) -> ConditionWeights {
        let mut w = ConditionWeights([0.0; Condition::COUNT]);
        w.set(self.0, 1.0);
        w
    }
}

fn build_with(roster: &[Specialty], demand: Only) -> Simulation<MemoryRecorder, Only> {
    SimulationBuilder::new(test_config(roster.len()), MemoryRecorder::new())
        .roster(roster.to_vec())
        .demand(demand)
        .build()
        .unwrap()
}

fn completions_of<D: DemandModel>(sim: &Simulation<MemoryRecorder, D>) -> Vec<CompletionRecord> {
    let mut v = sim.recorder().completions.clone();
    v.sort_by(|a, b| a.start_minutes.total_cmp(&b.start_minutes));
    v
}

/// Fails every write except registration.
#[derive(Default)]
struct BrokenRecorder {
    inner: MemoryRecorder,
}

impl Recorder for BrokenRecorder {
    fn register_simulation(&mut self, new: &NewSimulation) -> RecordResult<SimId> {
        self.inner.register_simulation(new)
    }

    fn simulation(&self, id: SimId) -> RecordResult<Option<crate::record::SimulationRecord>> {
        self.inner.simulation(id)
    }

    fn record_completion(&mut self, _rec: &CompletionRecord) -> RecordResult<()> {
        Err(RecordError::Backend("disk full".into()))
    }

    fn record_snapshot(&mut self, _snapshot: &Snapshot) -> RecordResult<()> {
        Err(RecordError::Backend("disk full".into()))
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use super::*;

    #[test]
    fn registers_a_new_identity() {
        let sim = build(test_config(30));
        assert_eq!(sim.id(), SimId(1));
        assert_eq!(sim.recorder().simulations.len(), 1);
        assert_eq!(sim.fleet().active_count(), 30);
        assert_eq!(sim.now(), SimTime::ZERO);
    }

    #[test]
    fn invalid_config_errors() {
        let cfg = SimConfig { arrival_rate: 0.0, ..test_config(10) };
        assert!(SimulationBuilder::new(cfg, MemoryRecorder::new()).build().is_err());
        assert!(SimulationBuilder::new(test_config(0), MemoryRecorder::new()).build().is_err());
    }

    #[test]
    fn roster_sets_fleet_size() {
        let sim = SimulationBuilder::new(test_config(30), MemoryRecorder::new())
            .roster(vec![Specialty::Cardiology, Specialty::Generalist])
            .build()
            .unwrap();
        assert_eq!(sim.fleet().active_count(), 2);
        assert_eq!(sim.recorder().simulations[0].num_doctors, 2);
    }

    #[test]
    fn empty_roster_rejected() {
        let result = SimulationBuilder::new(test_config(3), MemoryRecorder::new()).roster(vec![]).build();
        assert!(result.is_err());
    }
}

// ── Running ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod run_tests {
    use super::*;

    #[test]
    fn clock_lands_on_target() {
        let mut sim = build(test_config(30));
        assert_eq!(sim.run_until(SimTime(600.0)).unwrap(), RunOutcome::Horizon);
        assert_eq!(sim.now(), SimTime(600.0));
        assert_eq!(sim.run_for(60.0).unwrap(), RunOutcome::Horizon);
        assert_eq!(sim.now(), SimTime(660.0));
    }

    #[test]
    fn patients_flow_through() {
        let mut sim = build(test_config(30));
        sim.run_until(SimTime(600.0)).unwrap();
        assert!(sim.patients_total() > 0);
        assert!(sim.patients_treated() > 0);
        assert!(sim.patients_treated() <= sim.patients_total());
        assert_eq!(sim.recorder().completions.len() as u64, sim.patients_treated());
        assert_eq!(sim.fleet().total_served(), sim.patients_treated());
        assert_eq!(sim.history().total_completions(), sim.patients_treated());
    }

    #[test]
    fn patient_times_are_ordered() {
        let mut sim = build(test_config(5));
        sim.run_until(SimTime(1_440.0)).unwrap();
        for c in &sim.recorder().completions {
            assert!(c.arrival_minutes <= c.start_minutes);
            assert!(c.start_minutes <= c.end_minutes);
            assert!((c.end_minutes - c.start_minutes - c.treatment_minutes).abs() < 1e-6);
            assert!(c.treatment_minutes >= 1.0);
        }
    }

    #[test]
    fn same_seed_same_history() {
        let mut a = build(test_config(8));
        let mut b = build(test_config(8));
        a.run_until(SimTime(720.0)).unwrap();
        b.run_until(SimTime(720.0)).unwrap();
        assert_eq!(a.recorder().completions, b.recorder().completions);
    }

    #[test]
    fn state_samples_follow_interval() {
        let cfg = SimConfig { state_interval_minutes: 60.0, ..test_config(10) };
        let mut sim = build(cfg);
        sim.run_until(SimTime(600.0)).unwrap();
        let minutes: Vec<f64> = sim.recorder().states.iter().map(|s| s.minutes).collect();
        assert_eq!(minutes, (1..=10).map(|h| h as f64 * 60.0).collect::<Vec<_>>());
    }

    #[test]
    fn stop_handle_halts_before_dispatch() {
        let stop = StopHandle::new();
        let mut sim = SimulationBuilder::new(test_config(10), MemoryRecorder::new())
            .stop_handle(stop.clone())
            .build()
            .unwrap();
        stop.request_stop();
        assert_eq!(sim.run_until(SimTime(600.0)).unwrap(), RunOutcome::Stopped);
        assert_eq!(sim.patients_total(), 0);
    }

    #[test]
    fn shared_counters_track_the_run() {
        let counters = SharedCounters::new();
        let mut sim = SimulationBuilder::new(test_config(10), MemoryRecorder::new())
            .shared_counters(counters.clone())
            .build()
            .unwrap();
        sim.run_until(SimTime(300.0)).unwrap();
        let r = counters.read();
        assert_eq!(r.clock, SimTime(300.0));
        assert_eq!(r.created, sim.patients_total());
        assert_eq!(r.treated, sim.patients_treated());
        assert_eq!(r.waiting, sim.waiting_count());
    }

    #[test]
    fn recorder_failures_do_not_stop_the_run() {
        let mut sim = SimulationBuilder::new(test_config(10), BrokenRecorder::default()).build().unwrap();
        sim.run(SimTime(600.0)).unwrap();
        assert!(sim.patients_treated() > 0);
        // Every completion plus the final snapshot failed.
        assert_eq!(sim.write_failures(), sim.patients_treated() + 1);
    }
}

// ── Resources and routing inside a run ────────────────────────────────────────

#[cfg(test)]
mod resource_tests {
    use super::*;

    #[test]
    fn single_specialist_is_never_double_booked() {
        let mut sim = build_with(&[Specialty::Generalist], Only(Condition::ViralInfection, 30.0));
        sim.run_until(SimTime(600.0)).unwrap();
        let done = completions_of(&sim);
        assert!(done.len() > 5);
        for pair in done.windows(2) {
            assert!(pair[1].start_minutes >= pair[0].end_minutes - 1e-9);
        }
    }

    #[test]
    fn waiting_patients_are_served_fifo() {
        let mut sim = build_with(&[Specialty::Generalist], Only(Condition::UrinaryInfection, 30.0));
        sim.run_until(SimTime(900.0)).unwrap();
        let done = completions_of(&sim);
        assert!(done.iter().any(|c| c.wait_minutes > 0.0), "expected queueing");
        for pair in done.windows(2) {
            assert!(pair[0].arrival_minutes <= pair[1].arrival_minutes);
            assert!(pair[0].patient < pair[1].patient);
        }
    }

    #[test]
    fn queue_grows_under_saturation() {
        let mut sim = build_with(&[Specialty::Generalist], Only(Condition::AbdominalPain, 200.0));
        let mut last = 0;
        for hour in 1..=6 {
            sim.run_until(SimTime(hour as f64 * 60.0)).unwrap();
            let waiting = sim.waiting_count();
            assert!(waiting >= last, "hour {hour}: {waiting} < {last}");
            last = waiting;
        }
        assert!(last > 100);
        assert!(sim.average_current_wait() > 0.0);
    }

    #[test]
    fn free_cardiologist_serves_first_chest_pain_without_wait() {
        let roster = [Specialty::Cardiology, Specialty::Cardiology, Specialty::Generalist];
        let mut sim = build_with(&roster, Only(Condition::ChestPain, 1.0));
        sim.run_until(SimTime(720.0)).unwrap();
        let done = completions_of(&sim);
        let first = done.first().expect("at least one completion");
        assert_eq!(first.wait_minutes, 0.0);
        assert_eq!(first.specialty, Specialty::Cardiology);
        assert!(done.iter().all(|c| c.specialty == Specialty::Cardiology));
    }

    #[test]
    fn missing_specialty_falls_back_to_generalist() {
        let roster = [Specialty::Generalist, Specialty::Emergency];
        let mut sim = build_with(&roster, Only(Condition::Stroke, 5.0));
        sim.run_until(SimTime(600.0)).unwrap();
        assert_eq!(sim.patients_dropped(), 0);
        let done = completions_of(&sim);
        assert!(!done.is_empty());
        assert!(done.iter().all(|c| c.specialty == Specialty::Generalist));
    }
}

// ── Events and parameters ─────────────────────────────────────────────────────

#[cfg(test)]
mod event_tests {
    use super::*;

    #[test]
    fn event_effect_window() {
        let mut sim = build(test_config(30));
        sim.add_event(EventKind::Disaster, &json!({"arrival_factor": 2.0}), 480.0).unwrap();
        sim.run_until(SimTime(479.0)).unwrap();
        assert_eq!(sim.modulator().effects_at(SimTime(479.9)).arrival_factor, 2.0);
        assert!(sim.modulator().effects_at(SimTime(480.0)).is_neutral());
        sim.run_until(SimTime(600.0)).unwrap();
        assert!(sim.modulator().is_empty());
    }

    #[test]
    fn added_events_are_logged() {
        let mut sim = build(test_config(10));
        sim.run_until(SimTime(100.0)).unwrap();
        let id = sim.add_event(EventKind::Epidemic, &json!({"disease": "asthma_attack"}), 60.0).unwrap();
        let log = &sim.recorder().events;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].event_id, id);
        assert_eq!(log[0].start_minutes, 100.0);
        assert_eq!(log[0].end_minutes, 160.0);
        assert_eq!(log[0].params["disease"], "asthma_attack");
        // The logged payload is the validated parameter set, defaults included.
        assert_eq!(log[0].params["kind"], "epidemic");
        assert_eq!(log[0].params["disease_factor"], 3.0);
        let active = sim.modulator().get(id).unwrap();
        assert_eq!(log[0].params, serde_json::to_value(&active.params).unwrap());
    }

    #[test]
    fn malformed_event_rejected() {
        let mut sim = build(test_config(10));
        assert!(sim.add_event(EventKind::Epidemic, &json!({"disease_factor": "x"}), 60.0).is_err());
        assert!(sim.add_event(EventKind::Weather, &json!({}), -5.0).is_err());
        assert!(sim.modulator().is_empty());
        assert!(sim.recorder().events.is_empty());
    }

    #[test]
    fn update_parameters_records_changes() {
        let mut sim = build(test_config(10));
        let rec = sim.update_parameters(Some(35.0), Some(12)).unwrap().unwrap();
        assert_eq!(rec.old_values, json!({"arrival_rate": 20.0, "num_doctors": 10}));
        assert_eq!(rec.new_values, json!({"arrival_rate": 35.0, "num_doctors": 12}));
        assert_eq!(sim.arrival_rate(), 35.0);
        assert_eq!(sim.fleet().active_count(), 12);
        assert_eq!(sim.recorder().parameter_changes.len(), 1);
    }

    #[test]
    fn shrinking_an_idle_fleet() {
        let mut sim = build(test_config(10));
        sim.update_parameters(None, Some(7)).unwrap();
        assert_eq!(sim.fleet().active_count(), 7);
        assert_eq!(sim.fleet().count_of(Specialty::Generalist), 4);
        // Staffed fleets list emergency right after the generalists.
        assert_eq!(sim.fleet().count_of(Specialty::Emergency), 0);
        assert_eq!(sim.fleet().count_of(Specialty::Cardiology), 0);
        assert_eq!(sim.fleet().count_of(Specialty::Neurology), 1);
    }

    #[test]
    fn no_op_and_invalid_updates() {
        let mut sim = build(test_config(10));
        assert!(sim.update_parameters(Some(20.0), Some(10)).unwrap().is_none());
        assert!(sim.update_parameters(Some(-1.0), None).is_err());
        assert!(sim.update_parameters(None, Some(0)).is_err());
        assert!(sim.recorder().parameter_changes.is_empty());
    }
}

// ── Checkpoint and resume ─────────────────────────────────────────────────────

#[cfg(test)]
mod checkpoint_tests {
    use super::*;

    #[test]
    fn periodic_and_shutdown_snapshots() {
        let cfg = SimConfig { checkpoint_interval_minutes: 60.0, ..test_config(10) };
        let mut sim = build(cfg);
        sim.run(SimTime(300.0)).unwrap();
        let clocks: Vec<f64> = sim.recorder().snapshots.iter().map(|s| s.clock.0).collect();
        assert_eq!(clocks, [60.0, 120.0, 180.0, 240.0, 300.0, 300.0]);
        assert!(sim.recorder().finished);
        assert_eq!(sim.checkpoints().written(), 6);
    }

    #[test]
    fn snapshot_captures_counters_and_fleet() {
        let mut sim = build(test_config(10));
        sim.add_event(EventKind::Weather, &json!({"weather_type": "heat"}), 5_000.0).unwrap();
        sim.run_until(SimTime(500.0)).unwrap();
        let snap = sim.capture();
        assert_eq!(snap.clock, SimTime(500.0));
        assert_eq!(snap.created, sim.patients_total());
        assert_eq!(snap.treated, sim.patients_treated());
        assert_eq!(snap.doctors.len(), 10);
        assert_eq!(snap.events.len(), 1);
        assert!(snap.busy_doctors() <= 10);
    }

    #[test]
    fn resume_continues_counts() {
        let cfg = SimConfig { checkpoint_interval_minutes: 60.0, ..test_config(30) };

        let mut first = build(cfg.clone());
        first.run(SimTime(1_000.0)).unwrap();
        let (id, created, treated) = (first.id(), first.patients_total(), first.patients_treated());

        let mut resumed = SimulationBuilder::new(cfg.clone(), first.into_recorder())
            .resume(id)
            .build()
            .unwrap();
        assert_eq!(resumed.id(), id);
        assert_eq!(resumed.now(), SimTime(1_000.0));
        assert_eq!(resumed.patients_total(), created);
        assert_eq!(resumed.patients_treated(), treated);
        assert_eq!(resumed.fleet().total_served(), treated);
        assert_eq!(resumed.busy_count(), 0);
        assert_eq!(resumed.waiting_count(), 0);
        resumed.run_until(SimTime(2_000.0)).unwrap();

        let mut straight = build(cfg);
        straight.run_until(SimTime(2_000.0)).unwrap();

        let a = resumed.patients_treated() as f64;
        let b = straight.patients_treated() as f64;
        assert!(resumed.patients_treated() > treated);
        assert!((a - b).abs() <= (0.2 * b).max(20.0), "resumed {a} vs uninterrupted {b}");
        assert_eq!(resumed.fleet().active_count(), straight.fleet().active_count());
    }

    #[test]
    fn resume_keeps_persisted_fleet_size() {
        let mut first = build(test_config(10));
        first.run(SimTime(120.0)).unwrap();
        let id = first.id();

        let resumed = SimulationBuilder::new(test_config(20), first.into_recorder())
            .resume(id)
            .build()
            .unwrap();
        assert_eq!(resumed.fleet().active_count(), 10);
        assert_eq!(resumed.fleet().slots(), 10);
    }

    #[test]
    fn resume_without_snapshot_uses_registered_values() {
        let first = build(SimConfig { arrival_rate: 12.0, ..test_config(10) });
        let id = first.id();

        let resumed = SimulationBuilder::new(test_config(20), first.into_recorder())
            .resume(id)
            .build()
            .unwrap();
        assert_eq!(resumed.id(), id);
        assert_eq!(resumed.fleet().active_count(), 10);
        assert_eq!(resumed.arrival_rate(), 12.0);
        assert_eq!(resumed.now(), SimTime::ZERO);
        assert_eq!(resumed.recorder().simulations.len(), 1);
    }

    #[test]
    fn resume_unknown_identity_registers_new() {
        let sim = SimulationBuilder::new(test_config(10), MemoryRecorder::new())
            .resume(SimId(99))
            .build()
            .unwrap();
        assert_eq!(sim.id(), SimId(1));
    }

    #[test]
    fn resume_restores_events_and_parameter_changes() {
        let mut first = build(test_config(10));
        let epidemic = first.add_event(EventKind::Epidemic, &json!({}), 10_000.0).unwrap();
        first.update_parameters(Some(40.0), Some(12)).unwrap();
        first.run(SimTime(200.0)).unwrap();
        let id = first.id();

        let mut resumed = SimulationBuilder::new(test_config(10), first.into_recorder())
            .resume(id)
            .build()
            .unwrap();
        assert_eq!(resumed.arrival_rate(), 40.0);
        assert_eq!(resumed.fleet().active_count(), 12);
        assert_eq!(resumed.modulator().len(), 1);
        assert!(resumed.modulator().get(epidemic).is_some());
        let next = resumed.add_event(EventKind::Weather, &json!({}), 60.0).unwrap();
        assert!(next > epidemic);
    }
}
