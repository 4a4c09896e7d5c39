use hs_core::{DoctorId, ProcessId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("{process} released {doctor} without holding it")]
    NotHolder {
        doctor:  DoctorId,
        process: ProcessId,
    },

    #[error("{0} is not part of the fleet")]
    UnknownDoctor(DoctorId),

    #[error("delay must be finite and non-negative, got {0}")]
    InvalidDelay(f64),

    #[error("roster parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type KernelResult<T> = Result<T, KernelError>;
