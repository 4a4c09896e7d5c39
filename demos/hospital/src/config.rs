//! The JSON run file.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use hs_core::{MINUTES_PER_DAY, SimConfig, SimId, SimTime};
use hs_demand::{EventKind, EventParams};
use hs_trajectory::EnsembleConfig;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Csv,
    Sqlite,
    Memory,
}

/// An event added once the clock reaches `at_day`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub at_day:        f64,
    pub kind:          EventKind,
    #[serde(default)]
    pub params:        Value,
    #[serde(default = "one_day")]
    pub duration_days: f64,
}

/// A parameter update applied once the clock reaches `at_day`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduledChange {
    pub at_day:       f64,
    #[serde(default)]
    pub arrival_rate: Option<f64>,
    #[serde(default)]
    pub num_doctors:  Option<usize>,
}

fn one_day() -> f64 {
    1.0
}

/// Everything one invocation of the driver does.
///
/// Day offsets (`horizon_days`, `at_day`) count from the clock the run
/// starts at, which is the snapshot clock when resuming.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RunFile {
    pub sim:               SimConfig,
    pub horizon_days:      f64,
    pub resume:            Option<SimId>,
    pub backend:           Backend,
    pub output_dir:        PathBuf,
    /// Optional `doctor_id,specialty` CSV replacing the default composition.
    pub roster:            Option<PathBuf>,
    pub events:            Vec<ScheduledEvent>,
    pub parameter_changes: Vec<ScheduledChange>,
    /// Run an ensemble from the finished simulation.
    pub ensemble:          Option<EnsembleConfig>,
    pub poll_interval_ms:  u64,
    /// Ask the simulation to stop after this much wall-clock time.
    pub max_wall_seconds:  Option<u64>,
}

impl Default for RunFile {
    fn default() -> Self {
        Self {
            sim:               SimConfig::default(),
            horizon_days:      365.0,
            resume:            None,
            backend:           Backend::Csv,
            output_dir:        PathBuf::from("output/hospital"),
            roster:            None,
            events:            Vec::new(),
            parameter_changes: Vec::new(),
            ensemble:          None,
            poll_interval_ms:  1_000,
            max_wall_seconds:  None,
        }
    }
}

impl RunFile {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening run file {}", path.display()))?;
        let run: RunFile = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing run file {}", path.display()))?;
        run.validate()?;
        Ok(run)
    }

    /// Reject what would otherwise fail mid-run.
    pub fn validate(&self) -> Result<()> {
        self.sim.validate()?;
        if !self.horizon_days.is_finite() || self.horizon_days <= 0.0 {
            bail!("horizon_days must be positive, got {}", self.horizon_days);
        }
        for (i, e) in self.events.iter().enumerate() {
            if !e.at_day.is_finite() || e.at_day < 0.0 {
                bail!("events[{i}]: at_day must be >= 0, got {}", e.at_day);
            }
            if !e.duration_days.is_finite() || e.duration_days <= 0.0 {
                bail!("events[{i}]: duration_days must be positive, got {}", e.duration_days);
            }
            EventParams::from_bag(e.kind, &e.params).with_context(|| format!("events[{i}]"))?;
        }
        for (i, c) in self.parameter_changes.iter().enumerate() {
            if !c.at_day.is_finite() || c.at_day < 0.0 {
                bail!("parameter_changes[{i}]: at_day must be >= 0, got {}", c.at_day);
            }
            if c.arrival_rate.is_none() && c.num_doctors.is_none() {
                bail!("parameter_changes[{i}] changes nothing");
            }
        }
        if let Some(ensemble) = &self.ensemble {
            ensemble.validate()?;
        }
        Ok(())
    }
}

/// What to do at one instant of the run.
#[derive(Clone, Debug)]
pub enum Action {
    Event(ScheduledEvent),
    Change(ScheduledChange),
}

/// Scheduled actions in clock order, relative to `origin`.  Ties keep run
/// file order, events before parameter changes.
pub fn timeline(run: &RunFile, origin: SimTime) -> Vec<(SimTime, Action)> {
    let mut plan: Vec<(SimTime, Action)> = run
        .events
        .iter()
        .map(|e| (origin.after(e.at_day * MINUTES_PER_DAY), Action::Event(e.clone())))
        .chain(
            run.parameter_changes
                .iter()
                .map(|c| (origin.after(c.at_day * MINUTES_PER_DAY), Action::Change(c.clone()))),
        )
        .collect();
    plan.sort_by(|a, b| a.0.cmp(&b.0));
    plan
}
