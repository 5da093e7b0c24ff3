//! Ladder error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LadderError {
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    #[error("Invalid amount descriptor: {0}")]
    InvalidAmount(String),
}

pub type LadderResult<T> = Result<T, LadderError>;
