//! DCA order-ladder bot.
//!
//! Loads the layered configuration, wires the scheduler to the paper
//! exchange and runs it:
//! - one manual cycle (`--once STATE`), reported as JSON
//! - or the configured trigger loop until Ctrl-C

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use self::config::{AppConfig, TelemetryConfig};
pub use error::{AppError, AppResult};
