//! A capacity-1 resource with a FIFO wait list.
//!
//! Two queues are tracked separately:
//!
//! - `waiters`: the processes suspended on `request`, granted strictly in
//!   arrival order;
//! - `queue`: the patients a routing policy can observe.  A patient enters
//!   it just before requesting and leaves it when granted.

use std::collections::VecDeque;

use hs_core::{DoctorId, PatientId, ProcessId, Specialty};

use crate::{KernelError, KernelResult};

/// Outcome of [`Specialist::request`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Grant {
    /// The specialist was free; the requester now holds it.
    Granted,
    /// The requester was appended to the wait list at `position` (0 = next).
    Queued { position: usize },
}

#[derive(Clone, Debug)]
pub struct Specialist {
    pub id:        DoctorId,
    pub specialty: Specialty,
    /// Patients treated to completion, including those restored from a
    /// snapshot.
    pub served:    u64,
    /// Retired specialists keep their arena slot but take no new patients.
    pub retired:   bool,
    holder:        Option<ProcessId>,
    waiters:       VecDeque<ProcessId>,
    queue:         VecDeque<PatientId>,
}

impl Specialist {
    pub fn new(id: DoctorId, specialty: Specialty) -> Self {
        Self {
            id,
            specialty,
            served:  0,
            retired: false,
            holder:  None,
            waiters: VecDeque::new(),
            queue:   VecDeque::new(),
        }
    }

    /// Acquire immediately if free, otherwise join the wait list.
    pub fn request(&mut self, process: ProcessId) -> Grant {
        if self.holder.is_none() {
            self.holder = Some(process);
            Grant::Granted
        } else {
            self.waiters.push_back(process);
            Grant::Queued { position: self.waiters.len() - 1 }
        }
    }

    /// Release the specialist.  Occupancy passes to the head waiter, which
    /// is returned so the caller can resume it at the current instant.
    pub fn release(&mut self, process: ProcessId) -> KernelResult<Option<ProcessId>> {
        if self.holder != Some(process) {
            return Err(KernelError::NotHolder { doctor: self.id, process });
        }
        self.holder = self.waiters.pop_front();
        Ok(self.holder)
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.holder.is_none()
    }

    #[inline]
    pub fn holder(&self) -> Option<ProcessId> {
        self.holder
    }

    /// 0 or 1.
    #[inline]
    pub fn occupancy(&self) -> usize {
        usize::from(self.holder.is_some())
    }

    // ── Observable patient queue ──────────────────────────────────────────

    pub fn enqueue_patient(&mut self, patient: PatientId) {
        self.queue.push_back(patient);
    }

    /// Remove `patient` from the observable queue.  Returns `false` if it was
    /// not queued here.
    pub fn dequeue_patient(&mut self, patient: PatientId) -> bool {
        match self.queue.iter().position(|&p| p == patient) {
            Some(i) => {
                self.queue.remove(i);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Idle with nobody waiting; the only state a specialist may be retired
    /// from.
    pub fn is_idle(&self) -> bool {
        self.holder.is_none() && self.waiters.is_empty() && self.queue.is_empty()
    }
}
