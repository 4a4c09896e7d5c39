//! Unit tests for hs-core primitives.

#[cfg(test)]
mod ids {
    use crate::{DoctorId, EventId, PatientId};

    #[test]
    fn index_and_next() {
        let id = DoctorId(4);
        assert_eq!(id.index(), 4);
        assert_eq!(id.next(), DoctorId(5));
        assert_eq!(DoctorId::try_from(4usize).unwrap(), id);
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(DoctorId::INVALID.0, u32::MAX);
        assert_eq!(PatientId::INVALID.0, u64::MAX);
    }

    #[test]
    fn display() {
        assert_eq!(EventId(3).to_string(), "EventId(3)");
    }
}

#[cfg(test)]
mod time {
    use chrono::NaiveDate;

    use crate::{SimCalendar, SimConfig, SimTime};

    #[test]
    fn ordering_is_total() {
        assert!(SimTime(1.0) < SimTime(1.5));
        assert_eq!(SimTime(2.0).max(SimTime(-1.0)), SimTime(2.0));
        assert_eq!(SimTime(10.0).since(SimTime(4.0)), 6.0);
    }

    #[test]
    fn calendar_fields() {
        let cal = SimCalendar::default();
        // Weekdays count from the run start, not from the calendar date.
        assert_eq!(cal.weekday(SimTime::ZERO), 0);
        assert_eq!(cal.weekday(SimTime::from_days(5.5)), 5);
        assert_eq!(cal.weekday(SimTime::from_days(7.0)), 0);
        assert_eq!(cal.hour(SimTime(60.0 * 13.5)), 13);
        assert_eq!(cal.month_day(SimTime::from_days(31.0)), (2, 1));
        assert_eq!(cal.month(SimTime::from_days(364.0)), 12);
    }

    #[test]
    fn calendar_custom_start() {
        let start = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap().and_hms_opt(23, 0, 0).unwrap();
        let cal = SimCalendar::new(start);
        assert_eq!(cal.month_day(SimTime(59.0)), (12, 31));
        assert_eq!(cal.month_day(SimTime(60.0)), (1, 1));
    }

    #[test]
    fn config_validation() {
        assert!(SimConfig::default().validate().is_ok());
        let bad = SimConfig { num_doctors: 0, ..SimConfig::default() };
        assert!(bad.validate().is_err());
        let bad = SimConfig { arrival_rate: f64::NAN, ..SimConfig::default() };
        assert!(bad.validate().is_err());
        let bad = SimConfig { checkpoint_interval_minutes: -1.0, ..SimConfig::default() };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn config_partial_json_uses_defaults() {
        let cfg: SimConfig = serde_json::from_str(r#"{"num_doctors": 12}"#).unwrap();
        assert_eq!(cfg.num_doctors, 12);
        assert_eq!(cfg.arrival_rate, 20.0);
    }
}

#[cfg(test)]
mod rng {
    use crate::SimRng;

    #[test]
    fn same_seed_same_stream() {
        let mut a = SimRng::new(7);
        let mut b = SimRng::new(7);
        for _ in 0..100 {
            assert_eq!(a.uniform(), b.uniform());
        }
    }

    #[test]
    fn children_are_deterministic() {
        let mut a = SimRng::new(1);
        let mut b = SimRng::new(1);
        assert_eq!(a.child(3).uniform(), b.child(3).uniform());
    }

    #[test]
    fn exponential_mean_is_close() {
        let mut rng = SimRng::new(11);
        let n = 20_000;
        let mean = (0..n).map(|_| rng.exponential(3.0)).sum::<f64>() / n as f64;
        assert!((mean - 3.0).abs() < 0.15, "mean {mean}");
    }

    #[test]
    fn normal_moments_are_close() {
        let mut rng = SimRng::new(12);
        let n = 20_000;
        let xs: Vec<f64> = (0..n).map(|_| rng.normal(1.0, 0.2)).collect();
        let mean = xs.iter().sum::<f64>() / n as f64;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        assert!((mean - 1.0).abs() < 0.01, "mean {mean}");
        assert!((var.sqrt() - 0.2).abs() < 0.01, "sd {}", var.sqrt());
    }

    #[test]
    fn weighted_index_respects_zero_weights() {
        let mut rng = SimRng::new(5);
        for _ in 0..200 {
            assert_eq!(rng.weighted_index(&[0.0, 2.0, 0.0]), Some(1));
        }
        assert_eq!(rng.weighted_index(&[0.0, 0.0]), None);
        assert_eq!(rng.weighted_index(&[]), None);
    }
}

#[cfg(test)]
mod catalog {
    use crate::{Condition, Specialty};

    #[test]
    fn names_round_trip() {
        for c in Condition::ALL {
            assert_eq!(c.name().parse::<Condition>().unwrap(), c);
        }
        for s in Specialty::ALL {
            assert_eq!(s.name().parse::<Specialty>().unwrap(), s);
        }
    }

    #[test]
    fn unknown_names_rejected() {
        assert!("pneumonia".parse::<Condition>().is_err());
        assert!("dentist".parse::<Specialty>().is_err());
    }

    #[test]
    fn indices_follow_catalog_order() {
        for (i, c) in Condition::ALL.iter().enumerate() {
            assert_eq!(c.index(), i);
        }
    }

    #[test]
    fn shares_sum_to_one() {
        let total: f64 = Specialty::ALL.iter().map(|s| s.target_share()).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn routing_table() {
        assert_eq!(Condition::Stroke.specialty(), Specialty::Neurology);
        assert_eq!(Condition::AsthmaAttack.specialty(), Specialty::Pulmonology);
        assert_eq!(Condition::OpenWound.specialty(), Specialty::Emergency);
    }
}
