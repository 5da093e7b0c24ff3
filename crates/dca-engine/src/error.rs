//! Engine error types.

use dca_core::CoreError;
use dca_ladder::LadderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Collaborator failure: {0}")]
    Collaborator(String),

    #[error("Scheduler already running")]
    AlreadyRunning,

    #[error("Scheduler terminated")]
    Terminated,

    #[error("Unknown registration topic: {0}")]
    UnknownTopic(String),

    #[error("Unsupported trigger mode: {0}")]
    UnsupportedTriggerMode(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    #[error("Ladder error: {0}")]
    Ladder(#[from] LadderError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;
