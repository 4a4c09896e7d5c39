//! Error types for hs-trajectory.

use thiserror::Error;

use hs_core::SimId;
use hs_sim::{RecordError, SimError};

#[derive(Debug, Error)]
pub enum TrajectoryError {
    #[error("base simulation covers {days:.1} simulated days; at least {required:.0} are required")]
    BaseTooShort { days: f64, required: f64 },

    #[error("{0} is not registered")]
    UnknownSimulation(SimId),

    #[error("invalid ensemble configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Sim(#[from] SimError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("parameter serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type TrajectoryResult<T> = Result<T, TrajectoryError>;
