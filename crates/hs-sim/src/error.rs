use hs_core::HsError;
use hs_demand::ModulatorError;
use hs_kernel::KernelError;
use thiserror::Error;

use crate::RecordError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] HsError),

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("event rejected: {0}")]
    Event(#[from] ModulatorError),

    #[error("recorder error: {0}")]
    Record(#[from] RecordError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SimResult<T> = Result<T, SimError>;
