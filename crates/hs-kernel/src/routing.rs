//! Assignment of arriving patients to specialists.

use hs_core::{DoctorId, SimRng, Specialty};

use crate::Fleet;

/// Chooses which specialist an arriving patient queues for.
///
/// Implementations read the fleet at the instant of arrival and must not
/// mutate it; the caller enqueues the patient on the returned specialist.
/// `None` means the fleet has no active specialist at all.
pub trait RoutingPolicy {
    fn select(&self, fleet: &Fleet, required: Specialty, rng: &mut SimRng) -> Option<DoctorId>;
}

/// Default policy: a uniformly random free candidate if any, otherwise the
/// candidate with the shortest observable queue.
///
/// Candidates come from [`Fleet::candidates`]: the required specialty, then
/// generalists, then anyone active.
#[derive(Copy, Clone, Debug, Default)]
pub struct ShortestQueue;

impl RoutingPolicy for ShortestQueue {
    fn select(&self, fleet: &Fleet, required: Specialty, rng: &mut SimRng) -> Option<DoctorId> {
        let candidates = fleet.candidates(required);
        let free = fleet.free_among(&candidates);
        match rng.choose(&free) {
            Some(&id) => Some(id),
            None => fleet.shortest_queue_among(&candidates),
        }
    }
}
