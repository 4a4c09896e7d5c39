//! `hs-output` — persistent [`Recorder`][hs_sim::Recorder] backends.
//!
//! | Feature   | Backend  | Files created                                                  |
//! |-----------|----------|----------------------------------------------------------------|
//! | *(none)*  | CSV      | one `.csv` per table plus `snapshots.jsonl`                    |
//! | `sqlite`  | SQLite   | `hospital.db`                                                  |
//!
//! Both backends persist the same tables:
//!
//! | Table                | Row type                  |
//! |----------------------|---------------------------|
//! | `simulations`        | `SimulationRecord`        |
//! | `patient_treated`    | `CompletionRecord`        |
//! | `hospital_state`     | `StateSample`             |
//! | `sim_metadata`       | `Snapshot` (JSON)         |
//! | `simulation_events`  | `EventLogRecord`          |
//! | `parameter_changes`  | `ParameterChangeRecord`   |
//! | `trajectories`       | `NewTrajectory`           |
//! | `trajectory_results` | `TrajectorySample`        |
//!
//! Reopening an existing output directory keeps earlier rows, so a
//! simulation identity can be resumed by a later process.
//!
//! # Usage
//!
//! ```rust,ignore
//! use hs_output::CsvRecorder;
//!
//! let recorder = CsvRecorder::open(Path::new("./output"))?;
//! let mut sim = SimulationBuilder::new(config, recorder).build()?;
//! sim.run(SimTime::from_days(30.0))?;
//! ```

pub mod csv;
pub mod error;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(test)]
mod tests;

pub use csv::CsvRecorder;
pub use error::{OutputError, OutputResult};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRecorder;

/// Calendar instants are stored as ISO-8601 text without a zone.
pub(crate) fn iso(t: &chrono::NaiveDateTime) -> String {
    t.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}
