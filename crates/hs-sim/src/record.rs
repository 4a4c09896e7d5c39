//! Row types handed to a [`Recorder`][crate::Recorder].
//!
//! Every record carries both simulation minutes and the matching calendar
//! instant so backends never need the run's calendar to interpret a row.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use hs_core::{Condition, DoctorId, EventId, PatientId, SimId, Specialty, TrajectoryId};
use hs_demand::EventKind;

/// Registration request for a new simulation identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewSimulation {
    pub num_doctors:  usize,
    pub arrival_rate: f64,
    pub start:        NaiveDateTime,
    pub seed:         u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub id:           SimId,
    pub num_doctors:  usize,
    pub arrival_rate: f64,
    pub start:        NaiveDateTime,
    pub seed:         u64,
}

impl SimulationRecord {
    pub fn from_new(id: SimId, new: &NewSimulation) -> Self {
        Self {
            id,
            num_doctors:  new.num_doctors,
            arrival_rate: new.arrival_rate,
            start:        new.start,
            seed:         new.seed,
        }
    }
}

/// One treated patient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub sim_id:            SimId,
    pub patient:           PatientId,
    pub condition:         Condition,
    pub doctor:            DoctorId,
    pub specialty:         Specialty,
    pub arrival_minutes:   f64,
    pub start_minutes:     f64,
    pub end_minutes:       f64,
    pub wait_minutes:      f64,
    pub treatment_minutes: f64,
    pub arrival_time:      NaiveDateTime,
    pub start_time:        NaiveDateTime,
    pub end_time:          NaiveDateTime,
}

/// Periodic hospital-state sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateSample {
    pub sim_id:        SimId,
    pub minutes:       f64,
    pub time:          NaiveDateTime,
    pub created:       u64,
    pub treated:       u64,
    pub busy:          usize,
    pub waiting:       usize,
    pub active_events: usize,
}

/// An event added to a running simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventLogRecord {
    pub sim_id:        SimId,
    pub event_id:      EventId,
    pub kind:          EventKind,
    pub params:        Value,
    pub start_minutes: f64,
    pub end_minutes:   f64,
    pub start_time:    NaiveDateTime,
    pub end_time:      NaiveDateTime,
}

/// A mid-run change to arrival rate or fleet size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterChangeRecord {
    pub sim_id:     SimId,
    pub minutes:    f64,
    pub time:       NaiveDateTime,
    pub old_values: Value,
    pub new_values: Value,
}

/// Registration request for one ensemble member.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewTrajectory {
    pub base_sim:      SimId,
    pub params:        Value,
    pub start_minutes: f64,
    pub end_minutes:   f64,
}

/// Aggregate counters sampled from an ensemble member.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySample {
    pub trajectory:       TrajectoryId,
    pub minutes:          f64,
    pub created:          u64,
    pub treated:          u64,
    pub busy:             usize,
    pub waiting:          usize,
    pub avg_wait_minutes: f64,
}
