use serde::{Deserialize, Serialize};

use hs_core::{Condition, DoctorId, PatientId, SimTime, Specialty};

/// One patient's journey through the facility.
///
/// `arrival <= service_start <= service_end` holds whenever the later fields
/// are set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Patient {
    pub id:                PatientId,
    pub condition:         Condition,
    pub treatment_minutes: f64,
    pub arrival:           SimTime,
    pub doctor:            Option<DoctorId>,
    pub service_start:     Option<SimTime>,
    pub service_end:       Option<SimTime>,
}

impl Patient {
    pub fn new(id: PatientId, condition: Condition, treatment_minutes: f64, arrival: SimTime) -> Self {
        Self {
            id,
            condition,
            treatment_minutes,
            arrival,
            doctor:        None,
            service_start: None,
            service_end:   None,
        }
    }

    #[inline]
    pub fn required_specialty(&self) -> Specialty {
        self.condition.specialty()
    }

    /// Queueing delay; `None` until service starts.
    pub fn wait_minutes(&self) -> Option<f64> {
        self.service_start.map(|s| s.since(self.arrival))
    }
}
