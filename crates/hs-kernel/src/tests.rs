//! Unit tests for hs-kernel.

use hs_core::{DoctorId, PatientId, ProcessId, SimRng, SimTime, Specialty};

use crate::{Fleet, Grant, KernelError, RoutingPolicy, Scheduler, ShortestQueue, Specialist};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn p(n: u64) -> ProcessId {
    ProcessId(n)
}

fn fleet_of(specialties: &[Specialty]) -> Fleet {
    Fleet::from_roster(specialties)
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod scheduler {
    use super::*;

    #[test]
    fn pops_in_time_order() {
        let mut s = Scheduler::new(SimTime::ZERO);
        s.schedule_at(p(1), SimTime(5.0));
        s.schedule_at(p(2), SimTime(1.0));
        s.schedule_at(p(3), SimTime(3.0));
        let order: Vec<_> = std::iter::from_fn(|| s.pop_due(SimTime(10.0))).map(|(_, id)| id).collect();
        assert_eq!(order, [p(2), p(3), p(1)]);
        assert_eq!(s.now(), SimTime(5.0));
    }

    #[test]
    fn ties_pop_in_submission_order() {
        let mut s = Scheduler::new(SimTime::ZERO);
        for i in 0..5 {
            s.schedule_at(p(i), SimTime(2.0));
        }
        let order: Vec<_> = std::iter::from_fn(|| s.pop_due(SimTime(2.0))).map(|(_, id)| id).collect();
        assert_eq!(order, (0..5).map(p).collect::<Vec<_>>());
    }

    #[test]
    fn stops_at_target_inclusive() {
        let mut s = Scheduler::new(SimTime::ZERO);
        s.schedule_at(p(1), SimTime(10.0));
        s.schedule_at(p(2), SimTime(10.5));
        assert_eq!(s.pop_due(SimTime(10.0)), Some((SimTime(10.0), p(1))));
        assert_eq!(s.pop_due(SimTime(10.0)), None);
        s.advance_to(SimTime(10.0));
        assert_eq!(s.now(), SimTime(10.0));
        assert_eq!(s.pop_due(SimTime(11.0)), Some((SimTime(10.5), p(2))));
    }

    #[test]
    fn timeout_is_relative_to_now() {
        let mut s = Scheduler::new(SimTime(100.0));
        let at = s.schedule_timeout(p(1), 15.0).unwrap();
        assert_eq!(at, SimTime(115.0));
    }

    #[test]
    fn invalid_delays_rejected() {
        let mut s = Scheduler::new(SimTime::ZERO);
        assert!(matches!(s.schedule_timeout(p(1), -1.0), Err(KernelError::InvalidDelay(_))));
        assert!(matches!(s.schedule_timeout(p(1), f64::NAN), Err(KernelError::InvalidDelay(_))));
        assert_eq!(s.pop_due(SimTime(f64::MAX)), None);
    }

    #[test]
    fn clock_never_goes_backwards() {
        let mut s = Scheduler::new(SimTime(50.0));
        s.advance_to(SimTime(10.0));
        assert_eq!(s.now(), SimTime(50.0));
        s.schedule_at(p(1), SimTime(20.0));
        assert_eq!(s.pop_due(SimTime(60.0)), Some((SimTime(50.0), p(1))));
    }
}

// ── Specialist ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod specialist {
    use super::*;

    #[test]
    fn occupancy_never_exceeds_one() {
        let mut d = Specialist::new(DoctorId(0), Specialty::Generalist);
        assert_eq!(d.request(p(1)), Grant::Granted);
        assert_eq!(d.request(p(2)), Grant::Queued { position: 0 });
        assert_eq!(d.request(p(3)), Grant::Queued { position: 1 });
        assert_eq!(d.occupancy(), 1);
        assert_eq!(d.holder(), Some(p(1)));
    }

    #[test]
    fn release_grants_in_fifo_order() {
        let mut d = Specialist::new(DoctorId(0), Specialty::Generalist);
        d.request(p(1));
        d.request(p(2));
        d.request(p(3));
        assert_eq!(d.release(p(1)).unwrap(), Some(p(2)));
        assert_eq!(d.release(p(2)).unwrap(), Some(p(3)));
        assert_eq!(d.release(p(3)).unwrap(), None);
        assert!(d.is_free());
    }

    #[test]
    fn holder_never_in_wait_list() {
        let mut d = Specialist::new(DoctorId(0), Specialty::Generalist);
        d.request(p(1));
        d.request(p(2));
        assert_eq!(d.release(p(1)).unwrap(), Some(p(2)));
        assert_eq!(d.holder(), Some(p(2)));
        // p(2) left the wait list when it took over.
        assert_eq!(d.release(p(2)).unwrap(), None);
    }

    #[test]
    fn release_by_non_holder_fails() {
        let mut d = Specialist::new(DoctorId(3), Specialty::Neurology);
        d.request(p(1));
        let err = d.release(p(9)).unwrap_err();
        assert!(matches!(err, KernelError::NotHolder { doctor: DoctorId(3), .. }));
        assert_eq!(d.holder(), Some(p(1)));
    }

    #[test]
    fn observable_queue() {
        let mut d = Specialist::new(DoctorId(0), Specialty::Generalist);
        d.enqueue_patient(PatientId(1));
        d.enqueue_patient(PatientId(2));
        assert_eq!(d.queue_len(), 2);
        assert!(d.dequeue_patient(PatientId(1)));
        assert!(!d.dequeue_patient(PatientId(1)));
        assert_eq!(d.queue_len(), 1);
        assert!(!d.is_idle());
        assert!(d.dequeue_patient(PatientId(2)));
        assert!(d.is_idle());
    }
}

// ── Fleet ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod fleet {
    use super::*;
    use crate::composition;

    fn count(comp: &[(Specialty, usize)], s: Specialty) -> usize {
        comp.iter().find(|(x, _)| *x == s).map(|(_, c)| *c).unwrap_or(0)
    }

    #[test]
    fn composition_of_thirty() {
        let c = composition(30);
        assert_eq!(c.iter().map(|(_, n)| n).sum::<usize>(), 30);
        assert_eq!(count(&c, Specialty::Generalist), 13);
        assert_eq!(count(&c, Specialty::Emergency), 6);
        assert_eq!(count(&c, Specialty::Neurology), 2);
    }

    #[test]
    fn composition_of_ten_has_every_specialty() {
        let c = composition(10);
        assert_eq!(c.iter().map(|(_, n)| n).sum::<usize>(), 10);
        assert!(c.iter().all(|(_, n)| *n >= 1));
    }

    #[test]
    fn composition_smaller_than_specialty_count() {
        let c = composition(1);
        assert_eq!(c.iter().map(|(_, n)| n).sum::<usize>(), 1);
        assert_eq!(count(&c, Specialty::Generalist), 1);
        let c = composition(2);
        assert_eq!(count(&c, Specialty::Generalist), 1);
        assert_eq!(count(&c, Specialty::Emergency), 1);
    }

    #[test]
    fn staffed_assigns_sequential_ids() {
        let f = Fleet::staffed(12);
        assert_eq!(f.slots(), 12);
        for (i, d) in f.iter().enumerate() {
            assert_eq!(d.id, DoctorId(i as u32));
        }
    }

    #[test]
    fn candidates_fall_back_to_generalists() {
        let f = fleet_of(&[Specialty::Generalist, Specialty::Emergency, Specialty::Generalist]);
        assert_eq!(f.candidates(Specialty::Neurology), [DoctorId(0), DoctorId(2)]);
        assert_eq!(f.candidates(Specialty::Emergency), [DoctorId(1)]);
    }

    #[test]
    fn candidates_fall_back_to_anyone() {
        let f = fleet_of(&[Specialty::Emergency]);
        assert_eq!(f.candidates(Specialty::Neurology), [DoctorId(0)]);
    }

    #[test]
    fn grow_fills_most_understaffed_specialty() {
        let mut f = fleet_of(&[Specialty::Generalist; 4]);
        let added = f.grow(2);
        assert_eq!(added, [DoctorId(4), DoctorId(5)]);
        // Every non-generalist pool is empty; emergency comes first in catalog order.
        assert_eq!(f.get(DoctorId(4)).unwrap().specialty, Specialty::Emergency);
        assert_eq!(f.active_count(), 6);
    }

    #[test]
    fn shrink_retires_idle_specialists_first() {
        let mut f = fleet_of(&[Specialty::Generalist, Specialty::Emergency, Specialty::Cardiology]);
        f.get_mut(DoctorId(2)).unwrap().request(p(1));
        let retired = f.shrink(2);
        // Cardiology is busy; emergency goes before the generalist.
        assert_eq!(retired, [DoctorId(1), DoctorId(0)]);
        assert_eq!(f.active_count(), 1);
        assert_eq!(f.slots(), 3);
    }

    #[test]
    fn shrink_order_is_non_generalists_then_generalists_by_id() {
        let mut f = fleet_of(&[
            Specialty::Generalist,
            Specialty::Cardiology,
            Specialty::Emergency,
            Specialty::Generalist,
            Specialty::Neurology,
            Specialty::Pulmonology,
        ]);
        f.get_mut(DoctorId(4)).unwrap().request(p(1));
        f.get_mut(DoctorId(5)).unwrap().enqueue_patient(PatientId(3));

        // Neurology is busy and pulmonology has a queue.
        assert_eq!(f.shrink(3), [DoctorId(1), DoctorId(2), DoctorId(0)]);
        assert_eq!(f.shrink(5), [DoctorId(3)]);
        assert_eq!(f.active().map(|d| d.id).collect::<Vec<_>>(), [DoctorId(4), DoctorId(5)]);
    }

    #[test]
    fn restore_keeps_served_and_clears_queues() {
        let mut f = fleet_of(&[Specialty::Generalist, Specialty::Pulmonology]);
        f.get_mut(DoctorId(1)).unwrap().served = 17;
        f.get_mut(DoctorId(1)).unwrap().request(p(1));
        f.get_mut(DoctorId(1)).unwrap().enqueue_patient(PatientId(8));
        let restored = Fleet::restore(&f.states());
        let d = restored.get(DoctorId(1)).unwrap();
        assert_eq!(d.served, 17);
        assert_eq!(d.specialty, Specialty::Pulmonology);
        assert!(d.is_free());
        assert_eq!(d.queue_len(), 0);
    }

    #[test]
    fn unknown_doctor_is_an_error() {
        let f = fleet_of(&[Specialty::Generalist]);
        assert!(matches!(f.get(DoctorId(7)), Err(KernelError::UnknownDoctor(DoctorId(7)))));
    }
}

// ── Routing ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod routing {
    use super::*;

    #[test]
    fn picks_the_free_matching_specialist() {
        let mut f = fleet_of(&[Specialty::Cardiology, Specialty::Cardiology, Specialty::Generalist]);
        f.get_mut(DoctorId(0)).unwrap().request(p(1));
        let mut rng = SimRng::new(1);
        for _ in 0..50 {
            assert_eq!(ShortestQueue.select(&f, Specialty::Cardiology, &mut rng), Some(DoctorId(1)));
        }
    }

    #[test]
    fn all_busy_picks_shortest_queue() {
        let mut f = fleet_of(&[Specialty::Emergency, Specialty::Emergency]);
        for (i, queued) in [(0u32, 3u64), (1, 1)] {
            let d = f.get_mut(DoctorId(i)).unwrap();
            d.request(p(100 + i as u64));
            for k in 0..queued {
                d.enqueue_patient(PatientId(k));
            }
        }
        let mut rng = SimRng::new(2);
        assert_eq!(ShortestQueue.select(&f, Specialty::Emergency, &mut rng), Some(DoctorId(1)));
    }

    #[test]
    fn free_ties_are_spread() {
        let f = fleet_of(&[Specialty::Generalist; 3]);
        let mut rng = SimRng::new(3);
        let mut seen = [false; 3];
        for _ in 0..200 {
            let id = ShortestQueue.select(&f, Specialty::Generalist, &mut rng).unwrap();
            seen[id.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn missing_specialty_routes_to_generalist() {
        let f = fleet_of(&[Specialty::Generalist, Specialty::Emergency]);
        let mut rng = SimRng::new(4);
        assert_eq!(ShortestQueue.select(&f, Specialty::Neurology, &mut rng), Some(DoctorId(0)));
    }

    #[test]
    fn empty_fleet_routes_nowhere() {
        let f = Fleet::default();
        let mut rng = SimRng::new(5);
        assert_eq!(ShortestQueue.select(&f, Specialty::Generalist, &mut rng), None);
    }
}

// ── Roster ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod roster {
    use std::io::Cursor;

    use super::*;
    use crate::load_roster_reader;

    #[test]
    fn parses_unordered_rows() {
        let csv = "doctor_id,specialty\n1,cardiology\n0,generalist\n2,Emergency\n";
        let roster = load_roster_reader(Cursor::new(csv)).unwrap();
        assert_eq!(roster, [Specialty::Generalist, Specialty::Cardiology, Specialty::Emergency]);
    }

    #[test]
    fn rejects_gaps_and_unknown_specialties() {
        let gap = "doctor_id,specialty\n0,generalist\n2,generalist\n";
        assert!(matches!(load_roster_reader(Cursor::new(gap)), Err(KernelError::Parse(_))));
        let bad = "doctor_id,specialty\n0,dentist\n";
        assert!(matches!(load_roster_reader(Cursor::new(bad)), Err(KernelError::Parse(_))));
    }
}
