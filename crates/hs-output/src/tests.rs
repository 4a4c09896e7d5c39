//! Integration tests for hs-output.

#[cfg(test)]
mod csv_tests {
    use chrono::NaiveDate;
    use serde_json::json;
    use tempfile::TempDir;

    use hs_core::{Condition, DoctorId, PatientId, SimConfig, SimId, SimTime, Specialty};
    use hs_demand::EventKind;
    use hs_sim::record::{CompletionRecord, NewSimulation};
    use hs_sim::{Recorder, SimulationBuilder};

    use crate::csv::{COMPLETIONS_HEADER, CsvRecorder, SIMULATIONS_HEADER};

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn new_sim() -> NewSimulation {
        NewSimulation {
            num_doctors:  12,
            arrival_rate: 18.5,
            start:        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap().and_hms_opt(6, 0, 0).unwrap(),
            seed:         7,
        }
    }

    fn completion(sim: SimId, patient: u64) -> CompletionRecord {
        let t = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        CompletionRecord {
            sim_id:            sim,
            patient:           PatientId(patient),
            condition:         Condition::ChestPain,
            doctor:            DoctorId(3),
            specialty:         Specialty::Cardiology,
            arrival_minutes:   10.0,
            start_minutes:     12.0,
            end_minutes:       52.0,
            wait_minutes:      2.0,
            treatment_minutes: 40.0,
            arrival_time:      t,
            start_time:        t,
            end_time:          t,
        }
    }

    fn headers(path: &std::path::Path) -> Vec<String> {
        let mut rdr = csv::Reader::from_path(path).unwrap();
        rdr.headers().unwrap().iter().map(str::to_owned).collect()
    }

    fn rows(path: &std::path::Path) -> Vec<csv::StringRecord> {
        let mut rdr = csv::Reader::from_path(path).unwrap();
        rdr.records().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn csv_files_created() {
        let dir = tmp();
        let _r = CsvRecorder::open(dir.path()).unwrap();
        for name in [
            "simulations.csv",
            "patient_treated.csv",
            "hospital_state.csv",
            "simulation_events.csv",
            "parameter_changes.csv",
            "trajectories.csv",
            "trajectory_results.csv",
            "snapshots.jsonl",
        ] {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }
    }

    #[test]
    fn csv_headers_correct() {
        let dir = tmp();
        let mut r = CsvRecorder::open(dir.path()).unwrap();
        r.finish().unwrap();
        assert_eq!(headers(&dir.path().join("simulations.csv")), SIMULATIONS_HEADER);
        assert_eq!(headers(&dir.path().join("patient_treated.csv")), COMPLETIONS_HEADER);
    }

    #[test]
    fn completion_rows_written() {
        let dir = tmp();
        let mut r = CsvRecorder::open(dir.path()).unwrap();
        let id = r.register_simulation(&new_sim()).unwrap();
        r.record_completion(&completion(id, 0)).unwrap();
        r.record_completion(&completion(id, 1)).unwrap();
        r.finish().unwrap();

        let read = rows(&dir.path().join("patient_treated.csv"));
        assert_eq!(read.len(), 2);
        assert_eq!(&read[0][0], "1"); // sim_id
        assert_eq!(&read[1][1], "1"); // patient_id
        assert_eq!(&read[0][2], "chest_pain");
        assert_eq!(&read[0][4], "cardiology");
        assert_eq!(&read[0][10], "2025-01-01T00:00:00");
    }

    #[test]
    fn registry_survives_reopen() {
        let dir = tmp();
        let first = {
            let mut r = CsvRecorder::open(dir.path()).unwrap();
            let id = r.register_simulation(&new_sim()).unwrap();
            r.finish().unwrap();
            id
        };

        let mut r = CsvRecorder::open(dir.path()).unwrap();
        let rec = r.simulation(first).unwrap().expect("registered");
        assert_eq!(rec.num_doctors, 12);
        assert_eq!(rec.arrival_rate, 18.5);
        assert_eq!(rec.start, new_sim().start);
        assert_eq!(rec.seed, 7);

        let second = r.register_simulation(&new_sim()).unwrap();
        assert_eq!(second, SimId(first.0 + 1));
        r.finish().unwrap();
        // Header written once.
        assert_eq!(rows(&dir.path().join("simulations.csv")).len(), 2);
    }

    #[test]
    fn unknown_simulation_is_none() {
        let dir = tmp();
        let r = CsvRecorder::open(dir.path()).unwrap();
        assert!(r.simulation(SimId(5)).unwrap().is_none());
        assert!(r.latest_snapshot(SimId(5)).unwrap().is_none());
    }

    #[test]
    fn csv_finish_idempotent() {
        let dir = tmp();
        let mut r = CsvRecorder::open(dir.path()).unwrap();
        r.finish().unwrap();
        r.finish().unwrap();
    }

    #[test]
    fn torn_snapshot_line_skipped() {
        let dir = tmp();
        let cfg = SimConfig { num_doctors: 5, checkpoint_interval_minutes: 0.0, ..SimConfig::default() };
        let id = {
            let recorder = CsvRecorder::open(dir.path()).unwrap();
            let mut sim = SimulationBuilder::new(cfg, recorder).build().unwrap();
            sim.run(SimTime(120.0)).unwrap();
            sim.id()
        };
        std::fs::OpenOptions::new()
            .append(true)
            .open(dir.path().join("snapshots.jsonl"))
            .and_then(|mut f| std::io::Write::write_all(&mut f, b"{\"sim_id\": 1, \"clo"))
            .unwrap();

        let r = CsvRecorder::open(dir.path()).unwrap();
        let snap = r.latest_snapshot(id).unwrap().expect("earlier snapshot kept");
        assert_eq!(snap.clock, SimTime(120.0));
    }

    #[test]
    fn integration_run_and_resume() {
        let dir = tmp();
        let cfg = SimConfig {
            num_doctors: 10,
            state_interval_minutes: 60.0,
            checkpoint_interval_minutes: 60.0,
            ..SimConfig::default()
        };

        let (id, treated) = {
            let recorder = CsvRecorder::open(dir.path()).unwrap();
            let mut sim = SimulationBuilder::new(cfg.clone(), recorder).build().unwrap();
            sim.add_event(EventKind::Disaster, &json!({}), 120.0).unwrap();
            sim.update_parameters(Some(25.0), None).unwrap();
            sim.run(SimTime(600.0)).unwrap();
            assert_eq!(sim.write_failures(), 0);
            (sim.id(), sim.patients_treated())
        };

        assert_eq!(rows(&dir.path().join("patient_treated.csv")).len() as u64, treated);
        assert_eq!(rows(&dir.path().join("hospital_state.csv")).len(), 10);
        assert_eq!(rows(&dir.path().join("simulation_events.csv")).len(), 1);
        let changes = rows(&dir.path().join("parameter_changes.csv"));
        assert_eq!(changes.len(), 1);
        assert_eq!(&changes[0][4], r#"{"arrival_rate":25.0}"#);

        let recorder = CsvRecorder::open(dir.path()).unwrap();
        let mut resumed = SimulationBuilder::new(cfg, recorder).resume(id).build().unwrap();
        assert_eq!(resumed.now(), SimTime(600.0));
        assert_eq!(resumed.patients_treated(), treated);
        assert_eq!(resumed.arrival_rate(), 25.0);
        resumed.run(SimTime(720.0)).unwrap();
        assert!(resumed.patients_treated() >= treated);
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod sqlite_tests {
    use chrono::NaiveDate;
    use tempfile::TempDir;

    use hs_core::{SimConfig, SimId, SimTime, TrajectoryId};
    use hs_sim::record::{NewSimulation, NewTrajectory, TrajectorySample};
    use hs_sim::{Recorder, SimulationBuilder};

    use crate::sqlite::SqliteRecorder;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn count(r: &SqliteRecorder, table: &str) -> i64 {
        r.connection()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn sqlite_db_created() {
        let dir = tmp();
        let _r = SqliteRecorder::open(dir.path()).unwrap();
        assert!(dir.path().join("hospital.db").exists());
    }

    #[test]
    fn register_and_query() {
        let dir = tmp();
        let mut r = SqliteRecorder::open(dir.path()).unwrap();
        let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let new = NewSimulation { num_doctors: 8, arrival_rate: 12.0, start, seed: 3 };
        let a = r.register_simulation(&new).unwrap();
        let b = r.register_simulation(&new).unwrap();
        assert_ne!(a, b);

        let rec = r.simulation(a).unwrap().expect("registered");
        assert_eq!(rec.num_doctors, 8);
        assert_eq!(rec.start, start);
        assert!(r.simulation(SimId(999)).unwrap().is_none());
    }

    #[test]
    fn trajectory_rows() {
        let dir = tmp();
        let mut r = SqliteRecorder::open(dir.path()).unwrap();
        let id = r
            .register_trajectory(&NewTrajectory {
                base_sim:      SimId(1),
                params:        serde_json::json!({"variance_factor": 1.1}),
                start_minutes: 0.0,
                end_minutes:   1440.0,
            })
            .unwrap();
        assert_ne!(id, TrajectoryId::INVALID);
        r.record_trajectory_sample(&TrajectorySample {
            trajectory:       id,
            minutes:          60.0,
            created:          20,
            treated:          15,
            busy:             4,
            waiting:          1,
            avg_wait_minutes: 3.5,
        })
        .unwrap();
        assert_eq!(count(&r, "trajectories"), 1);
        assert_eq!(count(&r, "trajectory_results"), 1);
    }

    #[test]
    fn run_then_resume() {
        let dir = tmp();
        let cfg = SimConfig { num_doctors: 6, checkpoint_interval_minutes: 120.0, ..SimConfig::default() };

        let (id, created) = {
            let recorder = SqliteRecorder::open(dir.path()).unwrap();
            let mut sim = SimulationBuilder::new(cfg.clone(), recorder).build().unwrap();
            sim.run(SimTime(480.0)).unwrap();
            let r = sim.recorder();
            assert_eq!(count(r, "patient_treated") as u64, sim.patients_treated());
            assert_eq!(count(r, "sim_metadata"), 5);
            (sim.id(), sim.patients_total())
        };

        let recorder = SqliteRecorder::open(dir.path()).unwrap();
        let sim = SimulationBuilder::new(cfg, recorder).resume(id).build().unwrap();
        assert_eq!(sim.id(), id);
        assert_eq!(sim.now(), SimTime(480.0));
        assert_eq!(sim.patients_total(), created);
    }
}
