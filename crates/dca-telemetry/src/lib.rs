//! Prometheus metrics and structured logging for the DCA bot.
//!
//! - Structured logging with tracing (pretty in development, JSON in production)
//! - Prometheus counters for cycles, built orders and scheduler state

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, DEFAULT_DIRECTIVE};
pub use metrics::Metrics;
