//! `Fleet`: an arena of specialists indexed by `DoctorId`.
//!
//! Slots are never removed: shrinking the fleet marks specialists retired so
//! every `DoctorId` handed out during a run stays valid (completion records
//! and snapshots refer to them).

use serde::{Deserialize, Serialize};

use hs_core::{DoctorId, Specialty};

use crate::{KernelError, KernelResult, Specialist};

/// Persistable view of one specialist.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DoctorState {
    pub id:        DoctorId,
    pub specialty: Specialty,
    pub served:    u64,
    pub queue_len: usize,
    pub busy:      bool,
    #[serde(default)]
    pub retired:   bool,
}

/// Per-specialty head counts for a fleet of `n`.
///
/// Each specialty gets `max(1, floor(n * share))`; the remainder is handed
/// out alternately to the generalist and emergency pools.  When `n` is
/// smaller than the number of specialties, the lowest-share pools are cut
/// first so the total is exactly `n`.
pub fn composition(n: usize) -> Vec<(Specialty, usize)> {
    let mut counts: Vec<(Specialty, usize)> = Specialty::ALL
        .iter()
        .map(|&s| (s, ((n as f64 * s.target_share()) as usize).max(1)))
        .collect();

    let mut total: usize = counts.iter().map(|(_, c)| c).sum();
    let mut toggle = false;
    while total < n {
        let pick = if toggle { Specialty::Emergency } else { Specialty::Generalist };
        if let Some(entry) = counts.iter_mut().find(|(s, _)| *s == pick) {
            entry.1 += 1;
        }
        toggle = !toggle;
        total += 1;
    }
    while total > n {
        let smallest = counts
            .iter_mut()
            .filter(|(_, c)| *c > 0)
            .min_by(|a, b| a.0.target_share().total_cmp(&b.0.target_share()));
        match smallest {
            Some(entry) => entry.1 -= 1,
            None => break,
        }
        total -= 1;
    }
    counts
}

#[derive(Clone, Debug, Default)]
pub struct Fleet {
    doctors: Vec<Specialist>,
}

impl Fleet {
    /// A fleet of `n` specialists following [`composition`].
    pub fn staffed(n: usize) -> Self {
        let roster: Vec<Specialty> = composition(n)
            .into_iter()
            .flat_map(|(s, c)| std::iter::repeat_n(s, c))
            .collect();
        Self::from_roster(&roster)
    }

    /// One specialist per roster entry, ids assigned in order.
    pub fn from_roster(roster: &[Specialty]) -> Self {
        let doctors = roster
            .iter()
            .enumerate()
            .map(|(i, &s)| Specialist::new(DoctorId(i as u32), s))
            .collect();
        Self { doctors }
    }

    /// Rebuild from persisted states: same ids, specialties, served counts
    /// and retirement flags; queues start empty and everyone is free.
    pub fn restore(states: &[DoctorState]) -> Self {
        let mut sorted: Vec<&DoctorState> = states.iter().collect();
        sorted.sort_by_key(|d| d.id);
        let doctors = sorted
            .into_iter()
            .enumerate()
            .map(|(i, st)| {
                let mut d = Specialist::new(DoctorId(i as u32), st.specialty);
                d.served = st.served;
                d.retired = st.retired;
                d
            })
            .collect();
        Self { doctors }
    }

    pub fn states(&self) -> Vec<DoctorState> {
        self.doctors
            .iter()
            .map(|d| DoctorState {
                id:        d.id,
                specialty: d.specialty,
                served:    d.served,
                queue_len: d.queue_len(),
                busy:      !d.is_free(),
                retired:   d.retired,
            })
            .collect()
    }

    // ── Access ────────────────────────────────────────────────────────────

    pub fn get(&self, id: DoctorId) -> KernelResult<&Specialist> {
        self.doctors.get(id.index()).ok_or(KernelError::UnknownDoctor(id))
    }

    pub fn get_mut(&mut self, id: DoctorId) -> KernelResult<&mut Specialist> {
        self.doctors.get_mut(id.index()).ok_or(KernelError::UnknownDoctor(id))
    }

    /// Every slot, retired included.
    pub fn iter(&self) -> impl Iterator<Item = &Specialist> {
        self.doctors.iter()
    }

    pub fn active(&self) -> impl Iterator<Item = &Specialist> {
        self.doctors.iter().filter(|d| !d.retired)
    }

    /// Arena size, retired slots included.
    pub fn slots(&self) -> usize {
        self.doctors.len()
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    pub fn count_of(&self, specialty: Specialty) -> usize {
        self.active().filter(|d| d.specialty == specialty).count()
    }

    /// Specialists currently holding a patient (retired ones may still be
    /// finishing a treatment when retirement is forced by a restore).
    pub fn busy_count(&self) -> usize {
        self.doctors.iter().filter(|d| !d.is_free()).count()
    }

    /// Patients in observable queues across the fleet.
    pub fn waiting_count(&self) -> usize {
        self.doctors.iter().map(Specialist::queue_len).sum()
    }

    pub fn total_served(&self) -> u64 {
        self.doctors.iter().map(|d| d.served).sum()
    }

    /// Routing candidates for `specialty`: matching active specialists, else
    /// active generalists, else the whole active fleet.
    pub fn candidates(&self, specialty: Specialty) -> Vec<DoctorId> {
        for pool in [Some(specialty), Some(Specialty::Generalist), None] {
            let ids: Vec<DoctorId> = self
                .active()
                .filter(|d| pool.is_none_or(|s| d.specialty == s))
                .map(|d| d.id)
                .collect();
            if !ids.is_empty() {
                return ids;
            }
        }
        Vec::new()
    }

    // ── Resizing ──────────────────────────────────────────────────────────

    /// Add `n` specialists, each time choosing the specialty furthest below
    /// its target share.
    pub fn grow(&mut self, n: usize) -> Vec<DoctorId> {
        let mut added = Vec::with_capacity(n);
        for _ in 0..n {
            let specialty = Specialty::ALL
                .into_iter()
                .min_by(|a, b| {
                    let ra = self.count_of(*a) as f64 / a.target_share();
                    let rb = self.count_of(*b) as f64 / b.target_share();
                    ra.total_cmp(&rb)
                })
                .unwrap_or(Specialty::Generalist);
            let id = DoctorId(self.doctors.len() as u32);
            self.doctors.push(Specialist::new(id, specialty));
            added.push(id);
        }
        added
    }

    /// Retire up to `n` idle specialists: every idle non-generalist in fleet
    /// order first, then idle generalists in fleet order.  Busy specialists
    /// and those with a queue are never retired, so fewer than `n` may go.
    pub fn shrink(&mut self, n: usize) -> Vec<DoctorId> {
        let (generalists, others): (Vec<&Specialist>, Vec<&Specialist>) = self
            .active()
            .filter(|d| d.is_idle())
            .partition(|d| d.specialty == Specialty::Generalist);

        let retired: Vec<DoctorId> = others
            .into_iter()
            .chain(generalists)
            .take(n)
            .map(|d| d.id)
            .collect();
        for id in &retired {
            self.doctors[id.index()].retired = true;
        }
        if retired.len() < n {
            log::warn!(
                "fleet shrink: requested {n} retirements, only {} specialists were idle",
                retired.len()
            );
        }
        retired
    }

    /// Free specialists among `ids`.
    pub fn free_among(&self, ids: &[DoctorId]) -> Vec<DoctorId> {
        ids.iter()
            .copied()
            .filter(|id| self.doctors.get(id.index()).is_some_and(Specialist::is_free))
            .collect()
    }

    /// Shortest observable queue among `ids`; the lowest id wins ties.
    pub fn shortest_queue_among(&self, ids: &[DoctorId]) -> Option<DoctorId> {
        ids.iter()
            .filter_map(|&id| self.doctors.get(id.index()).map(|d| (d.queue_len(), id)))
            .min()
            .map(|(_, id)| id)
    }
}
