//! Process state machines driven by the scheduler.
//!
//! Each process is resumed by a wake-up and either suspends again (a
//! timeout or a resource wait) or finishes.  Suspension is explicit:
//!
//! ```text
//! Arrivals:  Starting ──▶ AwaitingTimeout{until, effects} ──▶ (patient spawned) ──▶ AwaitingTimeout …
//! Journey:   Routing ──▶ AwaitingResource(doctor) ──▶ AwaitingTimeout{until, doctor} ──▶ done
//!                    └──────── granted at once ───────▶ AwaitingTimeout …
//! Collector: AwaitingTimeout ──▶ sample ──▶ AwaitingTimeout …
//! Checkpointer: AwaitingTimeout ──▶ snapshot ──▶ AwaitingTimeout …
//! ```

use hs_core::{DoctorId, PatientId, ProcessId, SimTime};
use hs_demand::arrival::{self, ArrivalDraw};
use hs_demand::{DemandContext, DemandModel, EventEffects};
use hs_kernel::{Grant, Patient, RoutingPolicy};

use crate::record::CompletionRecord;
use crate::{Recorder, SimResult, Simulation};

#[derive(Clone, Debug)]
pub(crate) enum Process {
    Arrivals(ArrivalPhase),
    Journey(Journey),
    Collector,
    Checkpointer,
}

#[derive(Clone, Debug)]
pub(crate) enum ArrivalPhase {
    Starting,
    /// Sleeping until the next patient materialises.  The effects composed
    /// before the sleep shape that patient.
    AwaitingTimeout { until: SimTime, effects: EventEffects },
}

#[derive(Clone, Debug)]
pub(crate) struct Journey {
    pub(crate) patient: Patient,
    pub(crate) phase:   JourneyPhase,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum JourneyPhase {
    Routing,
    AwaitingResource(DoctorId),
    AwaitingTimeout { until: SimTime, doctor: DoctorId },
}

impl Journey {
    /// Minutes spent waiting so far, if still waiting for a specialist.
    pub(crate) fn waiting_for(&self, now: SimTime) -> Option<f64> {
        match self.phase {
            JourneyPhase::Routing | JourneyPhase::AwaitingResource(_) => Some(now.since(self.patient.arrival)),
            JourneyPhase::AwaitingTimeout { .. } => None,
        }
    }
}

impl<R: Recorder, D: DemandModel, P: RoutingPolicy> Simulation<R, D, P> {
    // ── Arrivals ──────────────────────────────────────────────────────────

    pub(crate) fn step_arrivals(&mut self, pid: ProcessId, phase: ArrivalPhase) -> SimResult<ArrivalPhase> {
        let now = self.scheduler.now();

        if let ArrivalPhase::AwaitingTimeout { until, effects } = &phase {
            debug_assert_eq!(*until, now, "arrival woke off schedule");
            let ctx = DemandContext {
                now,
                calendar:  &self.calendar,
                base_rate: self.arrival_rate,
                effects,
            };
            let weights = self.demand.condition_weights(&ctx);
            let factor = self.demand.treatment_factor(&ctx);
            let draw = arrival::draw_patient(&weights, factor, &mut self.rng);
            self.spawn_patient(draw, now);
        }

        let effects = self.modulator.tick(now);
        let ctx = DemandContext {
            now,
            calendar:  &self.calendar,
            base_rate: self.arrival_rate,
            effects:   &effects,
        };
        let raw = self.demand.raw_rate(&ctx, &mut self.rng);
        let rate = arrival::effective_rate(raw, self.fleet.busy_count(), self.fleet.active_count());
        let gap = arrival::interarrival_minutes(rate, &mut self.rng);
        let until = self.scheduler.schedule_timeout(pid, gap)?;
        Ok(ArrivalPhase::AwaitingTimeout { until, effects })
    }

    fn spawn_patient(&mut self, draw: ArrivalDraw, now: SimTime) {
        let id = PatientId(self.next_patient);
        self.next_patient += 1;
        self.created += 1;

        let patient = Patient::new(id, draw.condition, draw.treatment_minutes, now);
        let pid = self.alloc_process();
        self.processes.insert(pid, Process::Journey(Journey { patient, phase: JourneyPhase::Routing }));
        self.scheduler.schedule_now(pid);
    }

    // ── Patient journey ───────────────────────────────────────────────────

    /// Advance one journey.  `None` when the patient has left.
    pub(crate) fn step_journey(&mut self, pid: ProcessId, mut journey: Journey) -> SimResult<Option<Journey>> {
        let now = self.scheduler.now();

        match journey.phase {
            JourneyPhase::Routing => {
                let required = journey.patient.required_specialty();
                let Some(doctor) = self.policy.select(&self.fleet, required, &mut self.rng) else {
                    self.dropped += 1;
                    log::warn!("no active specialist for {} ({}); patient dropped", journey.patient.id, required);
                    return Ok(None);
                };
                journey.patient.doctor = Some(doctor);
                let specialist = self.fleet.get_mut(doctor)?;
                specialist.enqueue_patient(journey.patient.id);
                match specialist.request(pid) {
                    Grant::Granted => self.begin_treatment(pid, journey, doctor).map(Some),
                    Grant::Queued { position } => {
                        log::trace!("{} waits for {doctor} behind {position} others", journey.patient.id);
                        journey.phase = JourneyPhase::AwaitingResource(doctor);
                        Ok(Some(journey))
                    }
                }
            }
            JourneyPhase::AwaitingResource(doctor) => self.begin_treatment(pid, journey, doctor).map(Some),
            JourneyPhase::AwaitingTimeout { until, doctor } => {
                debug_assert_eq!(until, now, "treatment woke off schedule");
                self.finish_treatment(pid, journey, doctor, now)?;
                Ok(None)
            }
        }
    }

    fn begin_treatment(&mut self, pid: ProcessId, mut journey: Journey, doctor: DoctorId) -> SimResult<Journey> {
        let now = self.scheduler.now();
        self.fleet.get_mut(doctor)?.dequeue_patient(journey.patient.id);
        journey.patient.service_start = Some(now);
        let until = self.scheduler.schedule_timeout(pid, journey.patient.treatment_minutes)?;
        journey.phase = JourneyPhase::AwaitingTimeout { until, doctor };
        Ok(journey)
    }

    fn finish_treatment(&mut self, pid: ProcessId, mut journey: Journey, doctor: DoctorId, now: SimTime) -> SimResult<()> {
        journey.patient.service_end = Some(now);
        let specialist = self.fleet.get_mut(doctor)?;
        specialist.served += 1;
        let specialty = specialist.specialty;
        self.treated += 1;

        let p = &journey.patient;
        let arrival_hour = self.calendar.hour(p.arrival);
        self.history.record_completion(p.condition, arrival_hour);

        let start = p.service_start.unwrap_or(now);
        let rec = CompletionRecord {
            sim_id:            self.id,
            patient:           p.id,
            condition:         p.condition,
            doctor,
            specialty,
            arrival_minutes:   p.arrival.0,
            start_minutes:     start.0,
            end_minutes:       now.0,
            wait_minutes:      start.since(p.arrival),
            treatment_minutes: p.treatment_minutes,
            arrival_time:      self.calendar.instant(p.arrival),
            start_time:        self.calendar.instant(start),
            end_time:          self.calendar.instant(now),
        };
        let written = self.recorder.record_completion(&rec);
        self.note_write("completion", written);

        if let Some(next) = self.fleet.get_mut(doctor)?.release(pid)? {
            self.scheduler.schedule_now(next);
        }
        Ok(())
    }
}
