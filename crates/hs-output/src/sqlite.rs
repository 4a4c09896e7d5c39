//! SQLite output backend (feature `sqlite`).
//!
//! Creates (or reopens) `hospital.db` in the output directory.  Simulation
//! ids and trajectory ids are the tables' `INTEGER PRIMARY KEY`s.

use std::path::Path;

use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, params};

use hs_core::{SimId, TrajectoryId};
use hs_sim::record::{
    CompletionRecord, EventLogRecord, NewSimulation, NewTrajectory, ParameterChangeRecord,
    SimulationRecord, StateSample, TrajectorySample,
};
use hs_sim::{RecordResult, Recorder, Snapshot};

use crate::{OutputError, OutputResult, iso};

const SCHEMA: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous  = NORMAL;
    CREATE TABLE IF NOT EXISTS simulations (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        num_doctors  INTEGER NOT NULL,
        arrival_rate REAL    NOT NULL,
        start_time   TEXT    NOT NULL,
        seed         INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS patient_treated (
        sim_id            INTEGER NOT NULL,
        patient_id        INTEGER NOT NULL,
        condition         TEXT    NOT NULL,
        doctor_id         INTEGER NOT NULL,
        specialty         TEXT    NOT NULL,
        arrival_minutes   REAL    NOT NULL,
        start_minutes     REAL    NOT NULL,
        end_minutes       REAL    NOT NULL,
        wait_minutes      REAL    NOT NULL,
        treatment_minutes REAL    NOT NULL,
        arrival_time      TEXT    NOT NULL,
        start_time        TEXT    NOT NULL,
        end_time          TEXT    NOT NULL
    );
    CREATE TABLE IF NOT EXISTS hospital_state (
        sim_id        INTEGER NOT NULL,
        minutes       REAL    NOT NULL,
        time          TEXT    NOT NULL,
        created       INTEGER NOT NULL,
        treated       INTEGER NOT NULL,
        busy          INTEGER NOT NULL,
        waiting       INTEGER NOT NULL,
        active_events INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS sim_metadata (
        sim_id        INTEGER NOT NULL,
        clock_minutes REAL    NOT NULL,
        taken_at      TEXT    NOT NULL,
        snapshot      TEXT    NOT NULL
    );
    CREATE INDEX IF NOT EXISTS sim_metadata_sim ON sim_metadata (sim_id);
    CREATE TABLE IF NOT EXISTS simulation_events (
        sim_id        INTEGER NOT NULL,
        event_id      INTEGER NOT NULL,
        kind          TEXT    NOT NULL,
        params        TEXT    NOT NULL,
        start_minutes REAL    NOT NULL,
        end_minutes   REAL    NOT NULL,
        start_time    TEXT    NOT NULL,
        end_time      TEXT    NOT NULL
    );
    CREATE TABLE IF NOT EXISTS parameter_changes (
        sim_id     INTEGER NOT NULL,
        minutes    REAL    NOT NULL,
        time       TEXT    NOT NULL,
        old_values TEXT    NOT NULL,
        new_values TEXT    NOT NULL
    );
    CREATE TABLE IF NOT EXISTS trajectories (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        base_sim      INTEGER NOT NULL,
        params        TEXT    NOT NULL,
        start_minutes REAL    NOT NULL,
        end_minutes   REAL    NOT NULL
    );
    CREATE TABLE IF NOT EXISTS trajectory_results (
        trajectory_id    INTEGER NOT NULL,
        minutes          REAL    NOT NULL,
        created          INTEGER NOT NULL,
        treated          INTEGER NOT NULL,
        busy             INTEGER NOT NULL,
        waiting          INTEGER NOT NULL,
        avg_wait_minutes REAL    NOT NULL
    );";

/// Persists every recorder table to an SQLite database.
pub struct SqliteRecorder {
    conn:     Connection,
    finished: bool,
}

impl SqliteRecorder {
    /// Open (or create) `hospital.db` in `dir` and initialise the schema.
    pub fn open(dir: &Path) -> OutputResult<Self> {
        std::fs::create_dir_all(dir)?;
        Self::open_file(&dir.join("hospital.db"))
    }

    /// Open (or create) the database at `path`.
    pub fn open_file(path: &Path) -> OutputResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        log::debug!("sqlite recorder at {}", path.display());
        Ok(Self { conn, finished: false })
    }

    /// Direct access for ad-hoc queries.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn insert_simulation(&mut self, new: &NewSimulation) -> OutputResult<SimId> {
        self.conn.execute(
            "INSERT INTO simulations (num_doctors, arrival_rate, start_time, seed) VALUES (?1, ?2, ?3, ?4)",
            params![new.num_doctors as i64, new.arrival_rate, iso(&new.start), new.seed as i64],
        )?;
        Ok(SimId(self.conn.last_insert_rowid() as u64))
    }

    fn query_simulation(&self, id: SimId) -> OutputResult<Option<SimulationRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT num_doctors, arrival_rate, start_time, seed FROM simulations WHERE id = ?1",
                params![id.0 as i64],
                |r| Ok((r.get::<_, i64>(0)?, r.get::<_, f64>(1)?, r.get::<_, String>(2)?, r.get::<_, i64>(3)?)),
            )
            .optional()?;
        let Some((num_doctors, arrival_rate, start, seed)) = row else {
            return Ok(None);
        };
        let start = start
            .parse::<NaiveDateTime>()
            .map_err(|e| OutputError::Malformed(format!("simulations.start_time {start:?}: {e}")))?;
        Ok(Some(SimulationRecord {
            id,
            num_doctors: num_doctors as usize,
            arrival_rate,
            start,
            seed: seed as u64,
        }))
    }

    fn insert_completion(&mut self, rec: &CompletionRecord) -> OutputResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO patient_treated \
             (sim_id, patient_id, condition, doctor_id, specialty, arrival_minutes, start_minutes, \
              end_minutes, wait_minutes, treatment_minutes, arrival_time, start_time, end_time) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )?;
        stmt.execute(params![
            rec.sim_id.0 as i64,
            rec.patient.0 as i64,
            rec.condition.name(),
            rec.doctor.0,
            rec.specialty.name(),
            rec.arrival_minutes,
            rec.start_minutes,
            rec.end_minutes,
            rec.wait_minutes,
            rec.treatment_minutes,
            iso(&rec.arrival_time),
            iso(&rec.start_time),
            iso(&rec.end_time),
        ])?;
        Ok(())
    }

    fn insert_state(&mut self, s: &StateSample) -> OutputResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO hospital_state (sim_id, minutes, time, created, treated, busy, waiting, active_events) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        stmt.execute(params![
            s.sim_id.0 as i64,
            s.minutes,
            iso(&s.time),
            s.created as i64,
            s.treated as i64,
            s.busy as i64,
            s.waiting as i64,
            s.active_events as i64,
        ])?;
        Ok(())
    }

    fn insert_snapshot(&mut self, snapshot: &Snapshot) -> OutputResult<()> {
        let json = serde_json::to_string(snapshot)?;
        self.conn.execute(
            "INSERT INTO sim_metadata (sim_id, clock_minutes, taken_at, snapshot) VALUES (?1, ?2, ?3, ?4)",
            params![snapshot.sim_id.0 as i64, snapshot.clock.0, iso(&snapshot.taken_at), json],
        )?;
        Ok(())
    }

    fn query_latest_snapshot(&self, sim: SimId) -> OutputResult<Option<Snapshot>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT snapshot FROM sim_metadata WHERE sim_id = ?1 ORDER BY rowid DESC LIMIT 1",
                params![sim.0 as i64],
                |r| r.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn insert_event(&mut self, rec: &EventLogRecord) -> OutputResult<()> {
        self.conn.execute(
            "INSERT INTO simulation_events \
             (sim_id, event_id, kind, params, start_minutes, end_minutes, start_time, end_time) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                rec.sim_id.0 as i64,
                rec.event_id.0 as i64,
                rec.kind.name(),
                serde_json::to_string(&rec.params)?,
                rec.start_minutes,
                rec.end_minutes,
                iso(&rec.start_time),
                iso(&rec.end_time),
            ],
        )?;
        Ok(())
    }

    fn insert_parameter_change(&mut self, rec: &ParameterChangeRecord) -> OutputResult<()> {
        self.conn.execute(
            "INSERT INTO parameter_changes (sim_id, minutes, time, old_values, new_values) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                rec.sim_id.0 as i64,
                rec.minutes,
                iso(&rec.time),
                serde_json::to_string(&rec.old_values)?,
                serde_json::to_string(&rec.new_values)?,
            ],
        )?;
        Ok(())
    }

    fn insert_trajectory(&mut self, new: &NewTrajectory) -> OutputResult<TrajectoryId> {
        self.conn.execute(
            "INSERT INTO trajectories (base_sim, params, start_minutes, end_minutes) VALUES (?1, ?2, ?3, ?4)",
            params![
                new.base_sim.0 as i64,
                serde_json::to_string(&new.params)?,
                new.start_minutes,
                new.end_minutes,
            ],
        )?;
        Ok(TrajectoryId(self.conn.last_insert_rowid() as u64))
    }

    fn insert_trajectory_sample(&mut self, s: &TrajectorySample) -> OutputResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO trajectory_results \
             (trajectory_id, minutes, created, treated, busy, waiting, avg_wait_minutes) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        stmt.execute(params![
            s.trajectory.0 as i64,
            s.minutes,
            s.created as i64,
            s.treated as i64,
            s.busy as i64,
            s.waiting as i64,
            s.avg_wait_minutes,
        ])?;
        Ok(())
    }
}

impl Recorder for SqliteRecorder {
    fn register_simulation(&mut self, new: &NewSimulation) -> RecordResult<SimId> {
        Ok(self.insert_simulation(new)?)
    }

    fn simulation(&self, id: SimId) -> RecordResult<Option<SimulationRecord>> {
        Ok(self.query_simulation(id)?)
    }

    fn record_completion(&mut self, rec: &CompletionRecord) -> RecordResult<()> {
        Ok(self.insert_completion(rec)?)
    }

    fn record_state(&mut self, sample: &StateSample) -> RecordResult<()> {
        Ok(self.insert_state(sample)?)
    }

    fn record_snapshot(&mut self, snapshot: &Snapshot) -> RecordResult<()> {
        Ok(self.insert_snapshot(snapshot)?)
    }

    fn latest_snapshot(&self, sim: SimId) -> RecordResult<Option<Snapshot>> {
        Ok(self.query_latest_snapshot(sim)?)
    }

    fn record_event(&mut self, rec: &EventLogRecord) -> RecordResult<()> {
        Ok(self.insert_event(rec)?)
    }

    fn record_parameter_change(&mut self, rec: &ParameterChangeRecord) -> RecordResult<()> {
        Ok(self.insert_parameter_change(rec)?)
    }

    fn register_trajectory(&mut self, new: &NewTrajectory) -> RecordResult<TrajectoryId> {
        Ok(self.insert_trajectory(new)?)
    }

    fn record_trajectory_sample(&mut self, sample: &TrajectorySample) -> RecordResult<()> {
        Ok(self.insert_trajectory_sample(sample)?)
    }

    fn finish(&mut self) -> RecordResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.conn
            .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            .map_err(OutputError::from)?;
        Ok(())
    }
}
