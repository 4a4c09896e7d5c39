//! Shared error type.
//!
//! Downstream crates define their own enums and wrap `HsError` where a core
//! failure can surface (configuration validation, name parsing).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HsError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown condition {0:?}")]
    UnknownCondition(String),

    #[error("unknown specialty {0:?}")]
    UnknownSpecialty(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for all `hs-*` crates.
pub type HsResult<T> = Result<T, HsError>;
