//! CSV output backend.
//!
//! Creates one file per table in the output directory, plus
//! `snapshots.jsonl` holding one JSON [`Snapshot`] per line.  Existing files
//! are appended to, and the simulation registry and latest snapshots are
//! loaded back on open so a later process can resume an identity.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDateTime;
use csv::{StringRecord, Writer, WriterBuilder};

use hs_core::{SimId, TrajectoryId};
use hs_sim::record::{
    CompletionRecord, EventLogRecord, NewSimulation, NewTrajectory, ParameterChangeRecord,
    SimulationRecord, StateSample, TrajectorySample,
};
use hs_sim::{RecordResult, Recorder, Snapshot};

use crate::{OutputError, OutputResult, iso};

pub const SIMULATIONS_HEADER: [&str; 5] = ["id", "num_doctors", "arrival_rate", "start_time", "seed"];

pub const COMPLETIONS_HEADER: [&str; 13] = [
    "sim_id",
    "patient_id",
    "condition",
    "doctor_id",
    "specialty",
    "arrival_minutes",
    "start_minutes",
    "end_minutes",
    "wait_minutes",
    "treatment_minutes",
    "arrival_time",
    "start_time",
    "end_time",
];

pub const STATES_HEADER: [&str; 8] =
    ["sim_id", "minutes", "time", "created", "treated", "busy", "waiting", "active_events"];

pub const EVENTS_HEADER: [&str; 8] = [
    "sim_id",
    "event_id",
    "kind",
    "params",
    "start_minutes",
    "end_minutes",
    "start_time",
    "end_time",
];

pub const PARAMETERS_HEADER: [&str; 5] = ["sim_id", "minutes", "time", "old_values", "new_values"];

pub const TRAJECTORIES_HEADER: [&str; 5] = ["id", "base_sim", "params", "start_minutes", "end_minutes"];

pub const TRAJECTORY_RESULTS_HEADER: [&str; 7] =
    ["trajectory_id", "minutes", "created", "treated", "busy", "waiting", "avg_wait_minutes"];

/// Writes every recorder table to CSV files in one directory.
pub struct CsvRecorder {
    dir:              PathBuf,
    simulations:      Writer<File>,
    completions:      Writer<File>,
    states:           Writer<File>,
    events:           Writer<File>,
    parameters:       Writer<File>,
    trajectories:     Writer<File>,
    trajectory_rows:  Writer<File>,
    snapshots:        BufWriter<File>,
    registry:         Vec<SimulationRecord>,
    latest:           BTreeMap<SimId, Snapshot>,
    next_trajectory:  u64,
}

impl CsvRecorder {
    /// Open (or create) the output files in `dir`.  Header rows are written
    /// only to new or empty files.
    pub fn open(dir: &Path) -> OutputResult<Self> {
        fs::create_dir_all(dir)?;

        let registry = load_registry(&dir.join("simulations.csv"))?;
        let latest = load_snapshots(&dir.join("snapshots.jsonl"))?;
        let next_trajectory = count_rows(&dir.join("trajectories.csv"))? + 1;
        log::debug!(
            "csv recorder at {}: {} simulations, {} snapshots on disk",
            dir.display(),
            registry.len(),
            latest.len()
        );

        let snapshots = OpenOptions::new().create(true).append(true).open(dir.join("snapshots.jsonl"))?;

        Ok(Self {
            dir:             dir.to_path_buf(),
            simulations:     appender(&dir.join("simulations.csv"), &SIMULATIONS_HEADER)?,
            completions:     appender(&dir.join("patient_treated.csv"), &COMPLETIONS_HEADER)?,
            states:          appender(&dir.join("hospital_state.csv"), &STATES_HEADER)?,
            events:          appender(&dir.join("simulation_events.csv"), &EVENTS_HEADER)?,
            parameters:      appender(&dir.join("parameter_changes.csv"), &PARAMETERS_HEADER)?,
            trajectories:    appender(&dir.join("trajectories.csv"), &TRAJECTORIES_HEADER)?,
            trajectory_rows: appender(&dir.join("trajectory_results.csv"), &TRAJECTORY_RESULTS_HEADER)?,
            snapshots:       BufWriter::new(snapshots),
            registry,
            latest,
            next_trajectory,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_simulation(&mut self, rec: &SimulationRecord) -> OutputResult<()> {
        self.simulations.write_record(&[
            rec.id.0.to_string(),
            rec.num_doctors.to_string(),
            rec.arrival_rate.to_string(),
            iso(&rec.start),
            rec.seed.to_string(),
        ])?;
        self.simulations.flush()?;
        Ok(())
    }

    fn write_completion(&mut self, rec: &CompletionRecord) -> OutputResult<()> {
        self.completions.write_record(&[
            rec.sim_id.0.to_string(),
            rec.patient.0.to_string(),
            rec.condition.name().to_string(),
            rec.doctor.0.to_string(),
            rec.specialty.name().to_string(),
            rec.arrival_minutes.to_string(),
            rec.start_minutes.to_string(),
            rec.end_minutes.to_string(),
            rec.wait_minutes.to_string(),
            rec.treatment_minutes.to_string(),
            iso(&rec.arrival_time),
            iso(&rec.start_time),
            iso(&rec.end_time),
        ])?;
        Ok(())
    }

    fn write_state(&mut self, s: &StateSample) -> OutputResult<()> {
        self.states.write_record(&[
            s.sim_id.0.to_string(),
            s.minutes.to_string(),
            iso(&s.time),
            s.created.to_string(),
            s.treated.to_string(),
            s.busy.to_string(),
            s.waiting.to_string(),
            s.active_events.to_string(),
        ])?;
        Ok(())
    }

    fn write_event(&mut self, rec: &EventLogRecord) -> OutputResult<()> {
        self.events.write_record(&[
            rec.sim_id.0.to_string(),
            rec.event_id.0.to_string(),
            rec.kind.name().to_string(),
            serde_json::to_string(&rec.params)?,
            rec.start_minutes.to_string(),
            rec.end_minutes.to_string(),
            iso(&rec.start_time),
            iso(&rec.end_time),
        ])?;
        self.events.flush()?;
        Ok(())
    }

    fn write_parameter_change(&mut self, rec: &ParameterChangeRecord) -> OutputResult<()> {
        self.parameters.write_record(&[
            rec.sim_id.0.to_string(),
            rec.minutes.to_string(),
            iso(&rec.time),
            serde_json::to_string(&rec.old_values)?,
            serde_json::to_string(&rec.new_values)?,
        ])?;
        self.parameters.flush()?;
        Ok(())
    }

    fn write_trajectory(&mut self, id: TrajectoryId, new: &NewTrajectory) -> OutputResult<()> {
        self.trajectories.write_record(&[
            id.0.to_string(),
            new.base_sim.0.to_string(),
            serde_json::to_string(&new.params)?,
            new.start_minutes.to_string(),
            new.end_minutes.to_string(),
        ])?;
        Ok(())
    }

    fn write_trajectory_sample(&mut self, s: &TrajectorySample) -> OutputResult<()> {
        self.trajectory_rows.write_record(&[
            s.trajectory.0.to_string(),
            s.minutes.to_string(),
            s.created.to_string(),
            s.treated.to_string(),
            s.busy.to_string(),
            s.waiting.to_string(),
            s.avg_wait_minutes.to_string(),
        ])?;
        Ok(())
    }

    fn write_snapshot(&mut self, snapshot: &Snapshot) -> OutputResult<()> {
        serde_json::to_writer(&mut self.snapshots, snapshot)?;
        self.snapshots.write_all(b"\n")?;
        self.snapshots.flush()?;
        self.latest.insert(snapshot.sim_id, snapshot.clone());
        Ok(())
    }

    fn flush_all(&mut self) -> OutputResult<()> {
        self.simulations.flush()?;
        self.completions.flush()?;
        self.states.flush()?;
        self.events.flush()?;
        self.parameters.flush()?;
        self.trajectories.flush()?;
        self.trajectory_rows.flush()?;
        self.snapshots.flush()?;
        Ok(())
    }
}

impl Recorder for CsvRecorder {
    fn register_simulation(&mut self, new: &NewSimulation) -> RecordResult<SimId> {
        let next = self.registry.iter().map(|s| s.id.0).max().unwrap_or(0) + 1;
        let rec = SimulationRecord::from_new(SimId(next), new);
        self.write_simulation(&rec)?;
        self.registry.push(rec);
        Ok(SimId(next))
    }

    fn simulation(&self, id: SimId) -> RecordResult<Option<SimulationRecord>> {
        Ok(self.registry.iter().find(|s| s.id == id).cloned())
    }

    fn record_completion(&mut self, rec: &CompletionRecord) -> RecordResult<()> {
        Ok(self.write_completion(rec)?)
    }

    fn record_state(&mut self, sample: &StateSample) -> RecordResult<()> {
        Ok(self.write_state(sample)?)
    }

    fn record_snapshot(&mut self, snapshot: &Snapshot) -> RecordResult<()> {
        Ok(self.write_snapshot(snapshot)?)
    }

    fn latest_snapshot(&self, sim: SimId) -> RecordResult<Option<Snapshot>> {
        Ok(self.latest.get(&sim).cloned())
    }

    fn record_event(&mut self, rec: &EventLogRecord) -> RecordResult<()> {
        Ok(self.write_event(rec)?)
    }

    fn record_parameter_change(&mut self, rec: &ParameterChangeRecord) -> RecordResult<()> {
        Ok(self.write_parameter_change(rec)?)
    }

    fn register_trajectory(&mut self, new: &NewTrajectory) -> RecordResult<TrajectoryId> {
        let id = TrajectoryId(self.next_trajectory);
        self.write_trajectory(id, new)?;
        self.next_trajectory += 1;
        Ok(id)
    }

    fn record_trajectory_sample(&mut self, sample: &TrajectorySample) -> RecordResult<()> {
        Ok(self.write_trajectory_sample(sample)?)
    }

    /// Flushes every file.  Safe to call repeatedly; rows written after a
    /// finish are flushed by the next one.
    fn finish(&mut self) -> RecordResult<()> {
        Ok(self.flush_all()?)
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

fn appender(path: &Path, header: &[&str]) -> OutputResult<Writer<File>> {
    let fresh = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut w = WriterBuilder::new().has_headers(false).from_writer(file);
    if fresh {
        w.write_record(header)?;
        w.flush()?;
    }
    Ok(w)
}

fn count_rows(path: &Path) -> OutputResult<u64> {
    if !path.exists() {
        return Ok(0);
    }
    let mut rdr = csv::Reader::from_path(path)?;
    let mut n = 0;
    for row in rdr.records() {
        row?;
        n += 1;
    }
    Ok(n)
}

fn field<T: FromStr>(row: &StringRecord, i: usize, name: &str) -> OutputResult<T> {
    row.get(i)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| OutputError::Malformed(format!("simulations.{name}: {:?}", row.get(i))))
}

fn load_registry(path: &Path) -> OutputResult<Vec<SimulationRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut rdr = csv::Reader::from_path(path)?;
    let mut out = Vec::new();
    for row in rdr.records() {
        let row = row?;
        out.push(SimulationRecord {
            id:           SimId(field(&row, 0, "id")?),
            num_doctors:  field(&row, 1, "num_doctors")?,
            arrival_rate: field(&row, 2, "arrival_rate")?,
            start:        field::<NaiveDateTime>(&row, 3, "start_time")?,
            seed:         field(&row, 4, "seed")?,
        });
    }
    Ok(out)
}

/// Latest snapshot per simulation.  A torn final line is skipped.
fn load_snapshots(path: &Path) -> OutputResult<BTreeMap<SimId, Snapshot>> {
    let mut latest = BTreeMap::new();
    if !path.exists() {
        return Ok(latest);
    }
    for (n, line) in BufReader::new(File::open(path)?).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Snapshot>(&line) {
            Ok(snap) => {
                latest.insert(snap.sim_id, snap);
            }
            Err(e) => log::warn!("{}:{}: unreadable snapshot skipped: {e}", path.display(), n + 1),
        }
    }
    Ok(latest)
}
