use thiserror::Error;

/// Rejections from [`EventParams::from_bag`][crate::EventParams::from_bag] and
/// [`EventModulator::add`][crate::EventModulator::add].
///
/// A rejected event never touches the active set.
#[derive(Debug, Error)]
pub enum ModulatorError {
    #[error("unknown event kind {0:?} (expected epidemic, disaster or weather)")]
    UnknownKind(String),

    #[error("{kind} parameters must be a JSON object")]
    NotAnObject { kind: &'static str },

    #[error("{kind}.{field}: {reason}")]
    InvalidField {
        kind:   &'static str,
        field:  &'static str,
        reason: String,
    },

    #[error("unknown condition {0:?}")]
    UnknownCondition(String),

    #[error("unknown weather type {0:?} (expected cold, heat or storm)")]
    UnknownWeather(String),

    #[error("event duration must be positive and finite, got {0}")]
    InvalidDuration(f64),
}

pub type ModulatorResult<T> = Result<T, ModulatorError>;
