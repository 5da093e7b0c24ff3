//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] ::config::ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] dca_engine::EngineError),

    #[error("Core error: {0}")]
    Core(#[from] dca_core::CoreError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] dca_telemetry::TelemetryError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
